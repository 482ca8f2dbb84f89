use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::TypeInfo;

/// Bidirectional name/value index of an `Enum8`/`Enum16` declaration.
/// Both directions are binary searches over sorted tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumIndex {
    by_value: Vec<(i64, String)>,
    by_name: Vec<(String, i64)>,
}

impl EnumIndex {
    pub fn from_type(t: &Arc<TypeInfo>) -> Result<Arc<Self>> {
        let mut by_value: Vec<(i64, String)> = t
            .enum_members()
            .map(|(name, value)| (value, name.to_string()))
            .collect();
        if by_value.is_empty() {
            return Err(Error::TypeNotFullySpecified(t.full_name.clone()));
        }
        by_value.sort_unstable_by_key(|(value, _)| *value);

        let mut by_name: Vec<(String, i64)> = by_value
            .iter()
            .map(|(value, name)| (name.clone(), *value))
            .collect();
        by_name.sort_unstable();

        Ok(Arc::new(Self { by_value, by_name }))
    }

    pub fn name_of(&self, value: i64) -> Result<&str> {
        self.by_value
            .binary_search_by_key(&value, |(v, _)| *v)
            .map(|i| self.by_value[i].1.as_str())
            .map_err(|_| Error::UnexpectedResponse(format!("unknown enum value {value}")))
    }

    pub fn value_of(&self, name: &str) -> Result<i64> {
        self.by_name
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .map(|i| self.by_name[i].1)
            .map_err(|_| Error::Overflow {
                ty: "Enum".to_string(),
                value: name.to_string(),
            })
    }
}
