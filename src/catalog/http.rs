use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{CatalogClient, ProductFilter};
use crate::{
    errors::CatalogError,
    models::{
        product::{ProductRecord, RecordBody},
        NewProduct, Product, ProductId,
    },
};

const PRODUCTS_PATH: &str = "products";

/// [`CatalogClient`] speaking JSON over HTTP.
#[derive(Clone, Debug)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCatalogClient {
    /// `timeout` bounds every request made through this client.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl(base_url.to_string()));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn products_url(&self) -> Result<Url, CatalogError> {
        Ok(self.base_url.join(PRODUCTS_PATH)?)
    }

    fn product_url(&self, id: &ProductId) -> Result<Url, CatalogError> {
        let mut url = self.products_url()?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidUrl(self.base_url.to_string()))?
            .push(&id.to_string());
        Ok(url)
    }
}

async fn ensure_success(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), "catalog request failed");
    Err(CatalogError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode_one(response: Response) -> Result<Product, CatalogError> {
    let record: ProductRecord = ensure_success(response).await?.json().await?;
    Ok(record.into())
}

/// Decodes a list response. A record that cannot be decoded is skipped
/// with a warning instead of failing the whole list.
async fn decode_many(response: Response) -> Result<Vec<Product>, CatalogError> {
    let values: Vec<serde_json::Value> = ensure_success(response).await?.json().await?;
    let mut products = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<ProductRecord>(value) {
            Ok(record) => products.push(record.into()),
            Err(err) => warn!(error = %err, "skipping undecodable catalog record"),
        }
    }
    Ok(products)
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        let response = self.client.get(self.products_url()?).send().await?;
        let products = decode_many(response).await?;
        debug!(count = products.len(), "listed products");
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        let response = self
            .client
            .get(self.products_url()?)
            .query(&filter.query_pairs())
            .send()
            .await?;
        let products = decode_many(response).await?;
        debug!(count = products.len(), "filtered products");
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        let response = self.client.get(self.product_url(id)?).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_one(response).await.map(Some)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id, barcode = %product.barcode))]
    async fn create_product(&self, product: &NewProduct) -> Result<Product, CatalogError> {
        let response = self
            .client
            .post(self.products_url()?)
            .json(product)
            .send()
            .await?;
        let created = decode_one(response).await?;
        debug!("product created");
        Ok(created)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    async fn update_product(&self, product: &Product) -> Result<Product, CatalogError> {
        let response = self
            .client
            .put(self.product_url(&product.id)?)
            .json(&RecordBody::from(product))
            .send()
            .await?;
        decode_one(response).await
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: &ProductId) -> Result<(), CatalogError> {
        let response = self.client.delete(self.product_url(id)?).send().await?;
        ensure_success(response).await?;
        debug!("product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_under_the_base_path() {
        let client = HttpCatalogClient::new("http://127.0.0.1:3001/api", Duration::from_secs(1))
            .unwrap();
        assert_eq!(
            client.products_url().unwrap().as_str(),
            "http://127.0.0.1:3001/api/products"
        );
        assert_eq!(
            client.product_url(&ProductId::Number(7)).unwrap().as_str(),
            "http://127.0.0.1:3001/api/products/7"
        );
        assert_eq!(
            client
                .product_url(&ProductId::Text("a b".into()))
                .unwrap()
                .as_str(),
            "http://127.0.0.1:3001/api/products/a%20b"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(matches!(
            HttpCatalogClient::new("not a url", Duration::from_secs(1)),
            Err(CatalogError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpCatalogClient::new("mailto:ops@example.com", Duration::from_secs(1)),
            Err(CatalogError::InvalidUrl(_))
        ));
    }
}
