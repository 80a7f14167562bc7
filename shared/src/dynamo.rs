//! DynamoDB-backed table store.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;

use crate::store::{Record, ScanFilter, ScanPage, TableStore};
use crate::{Error, Result};

type Item = HashMap<String, AttributeValue>;

/// `TableStore` over the DynamoDB API.
#[derive(Clone)]
pub struct DynamoStore {
    client: DynamoClient,
}

impl DynamoStore {
    pub fn new(client: DynamoClient) -> Self {
        Self { client }
    }
}

fn to_item(record: Record) -> Result<Item> {
    serde_dynamo::to_item(record)
        .map_err(|e| Error::Storage(format!("Failed to convert record: {}", e)))
}

fn from_item(item: Item) -> Result<Record> {
    serde_dynamo::from_item(item)
        .map_err(|e| Error::Storage(format!("Failed to convert item: {}", e)))
}

#[async_trait]
impl TableStore for DynamoStore {
    async fn get_item(&self, table: &str, key: &str, value: &str) -> Result<Option<Record>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .key(key, AttributeValue::S(value.to_string()))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to get item from {}: {}", table, e)))?;

        output.item.map(from_item).transpose()
    }

    async fn put_item(&self, table: &str, record: Record) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_item(record)?))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to put item into {}: {}", table, e)))?;

        Ok(())
    }

    async fn delete_item(&self, table: &str, key: &str, value: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(table)
            .key(key, AttributeValue::S(value.to_string()))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to delete item from {}: {}", table, e)))?;

        Ok(())
    }

    async fn scan_page(
        &self,
        table: &str,
        filter: Option<&ScanFilter>,
        start: Option<Record>,
    ) -> Result<ScanPage> {
        let mut request = self.client.scan().table_name(table);

        if let Some(filter) = filter {
            request = request
                .filter_expression("#attr = :value")
                .expression_attribute_names("#attr", &filter.attribute)
                .expression_attribute_values(":value", AttributeValue::S(filter.value.clone()));
        }

        if let Some(start) = start {
            request = request.set_exclusive_start_key(Some(to_item(start)?));
        }

        let output = request
            .send()
            .await
            .map_err(|e| Error::Storage(format!("Failed to scan {}: {}", table, e)))?;

        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(from_item)
            .collect::<Result<Vec<Record>>>()?;

        let continuation = output
            .last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(from_item)
            .transpose()?;

        Ok(ScanPage {
            items,
            continuation,
        })
    }
}
