//! Raw repositories: assets are plain files without components.

use serde_json::{json, Value};

use super::{ComponentQuery, RestoreBlobData, RestoreBlobStrategy};
use crate::DepotResult;

pub struct RawRestoreBlobStrategy;

impl RestoreBlobStrategy for RawRestoreBlobStrategy {
    fn format(&self) -> &'static str {
        "raw"
    }

    fn component_required(&self, _path: &str) -> bool {
        false
    }

    fn extract_attributes(&self, data: &RestoreBlobData) -> DepotResult<Value> {
        Ok(json!({ "content_type": data.content_type() }))
    }

    fn component_query(&self, _path: &str, _attributes: &Value) -> Option<ComponentQuery> {
        None
    }
}
