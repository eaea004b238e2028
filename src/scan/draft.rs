use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationError};

use crate::{
    errors::ScanError,
    models::{NewProduct, ProductId},
    scan::barcode::Barcode,
};

/// Form fields in display order: struct name, wire name.
const FORM_FIELDS: [(&str, &str); 5] = [
    ("name", "name"),
    ("product_type", "type"),
    ("barcode", "barcode"),
    ("price", "price"),
    ("supplier", "supplier"),
];

/// Draft of a product that is not in the catalog yet.
///
/// The barcode comes from the scan and cannot be edited. `price` holds the
/// text as typed; it is parsed on submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Validate)]
pub struct PendingNewProduct {
    #[validate(custom = "validate_required")]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(custom = "validate_required")]
    pub product_type: String,
    #[validate(custom = "validate_required")]
    barcode: String,
    #[validate(custom = "validate_price")]
    pub price: String,
    #[validate(custom = "validate_required")]
    pub supplier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Partial update of a draft; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DraftEdit {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub price: Option<String>,
    pub supplier: Option<String>,
    pub image: Option<String>,
}

impl PendingNewProduct {
    pub fn for_barcode(barcode: &Barcode) -> Self {
        Self {
            barcode: barcode.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn barcode(&self) -> &str {
        &self.barcode
    }

    pub fn apply(&mut self, edit: DraftEdit) {
        if let Some(name) = edit.name {
            self.name = name;
        }
        if let Some(product_type) = edit.product_type {
            self.product_type = product_type;
        }
        if let Some(price) = edit.price {
            self.price = price;
        }
        if let Some(supplier) = edit.supplier {
            self.supplier = supplier;
        }
        if let Some(image) = edit.image {
            self.image = Some(image).filter(|i| !i.trim().is_empty());
        }
    }

    /// Names of the fields that block submission, in form order.
    pub fn missing_fields(&self) -> Vec<String> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => {
                let failed = errors.field_errors();
                FORM_FIELDS
                    .iter()
                    .filter(|(field, wire)| failed.contains_key(field) || failed.contains_key(wire))
                    .map(|(_, wire)| wire.to_string())
                    .collect()
            }
        }
    }

    /// Turns a complete draft into a create request body.
    pub fn to_new_product(
        &self,
        id: ProductId,
        created_at: DateTime<Utc>,
    ) -> Result<NewProduct, ScanError> {
        let fields = self.missing_fields();
        if !fields.is_empty() {
            return Err(ScanError::ValidationIncomplete { fields });
        }

        let price = parse_price(&self.price).ok_or_else(|| ScanError::ValidationIncomplete {
            fields: vec!["price".to_string()],
        })?;

        Ok(NewProduct {
            id,
            name: self.name.trim().to_string(),
            product_type: self.product_type.trim().to_string(),
            barcode: self.barcode.clone(),
            price,
            supplier: self.supplier.trim().to_string(),
            image: self.image.clone(),
            stocks: Vec::new(),
            created_at,
        })
    }
}

fn parse_price(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim())
        .ok()
        .filter(|p| !p.is_sign_negative())
}

fn validate_required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

fn validate_price(value: &str) -> Result<(), ValidationError> {
    validate_required(value)?;
    if parse_price(value).is_none() {
        let mut err = ValidationError::new("price");
        err.message = Some("Price must be a non-negative number".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn draft() -> PendingNewProduct {
        let mut draft = PendingNewProduct::for_barcode(&Barcode::parse("12345678").unwrap());
        draft.apply(DraftEdit {
            name: Some("Desk lamp".into()),
            product_type: Some("Lighting".into()),
            price: Some("24.90".into()),
            supplier: Some("Lumen".into()),
            image: None,
        });
        draft
    }

    #[test]
    fn fresh_draft_only_has_the_barcode() {
        let draft = PendingNewProduct::for_barcode(&Barcode::parse(" 12345678 ").unwrap());
        assert_eq!(draft.barcode(), "12345678");
        assert_eq!(
            draft.missing_fields(),
            vec!["name", "type", "price", "supplier"]
        );
    }

    #[test]
    fn complete_draft_builds_a_create_body() {
        let now = Utc::now();
        let body = draft()
            .to_new_product(ProductId::Text("p-1".into()), now)
            .unwrap();

        assert_eq!(body.barcode, "12345678");
        assert_eq!(body.price, dec!(24.90));
        assert!(body.stocks.is_empty());
        assert_eq!(body.created_at, now);
    }

    #[test]
    fn blank_fields_block_submission() {
        let mut draft = draft();
        draft.apply(DraftEdit {
            supplier: Some("   ".into()),
            ..DraftEdit::default()
        });

        let err = draft
            .to_new_product(ProductId::generate(), Utc::now())
            .unwrap_err();
        assert_matches!(err, ScanError::ValidationIncomplete { fields } if fields == vec!["supplier"]);
    }

    #[test]
    fn unparsable_or_negative_price_is_flagged() {
        for bad in ["abc", "-1", "1,50"] {
            let mut draft = draft();
            draft.price = bad.to_string();
            assert_eq!(draft.missing_fields(), vec!["price"], "price {:?}", bad);
        }
    }

    #[test]
    fn blank_image_clears_it() {
        let mut draft = draft();
        draft.apply(DraftEdit {
            image: Some("https://img.example/lamp.png".into()),
            ..DraftEdit::default()
        });
        assert!(draft.image.is_some());
        draft.apply(DraftEdit {
            image: Some(" ".into()),
            ..DraftEdit::default()
        });
        assert!(draft.image.is_none());
    }
}
