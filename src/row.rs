use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, ErrorKind, Result};

/// A fetched row.
///
/// Values are JSON values as decoded by the native backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Row {
   /// Values in column order
   Ordered(Vec<JsonValue>),
   /// Values keyed by column name, in column order
   Assoc(IndexMap<String, JsonValue>),
   /// Record form of an associative row
   Object(Map<String, JsonValue>),
}

impl Row {
   pub fn len(&self) -> usize {
      match self {
         Row::Ordered(values) => values.len(),
         Row::Assoc(values) => values.len(),
         Row::Object(values) => values.len(),
      }
   }

   pub fn is_empty(&self) -> bool {
      self.len() == 0
   }

   /// Value at column position `index`.
   pub fn get(&self, index: usize) -> Option<&JsonValue> {
      match self {
         Row::Ordered(values) => values.get(index),
         Row::Assoc(values) => values.get_index(index).map(|(_, v)| v),
         Row::Object(values) => values.values().nth(index),
      }
   }

   /// Value of the column called `name`; ordered rows have no names.
   pub fn get_by_name(&self, name: &str) -> Option<&JsonValue> {
      match self {
         Row::Ordered(_) => None,
         Row::Assoc(values) => values.get(name),
         Row::Object(values) => values.get(name),
      }
   }

   /// Values in column order.
   pub fn into_values(self) -> Vec<JsonValue> {
      match self {
         Row::Ordered(values) => values,
         Row::Assoc(values) => values.into_values().collect(),
         Row::Object(values) => values.into_iter().map(|(_, v)| v).collect(),
      }
   }

   /// Deserialize the row into `T`.
   ///
   /// Named rows deserialize as a map, ordered rows as a sequence.
   pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
      serde_json::from_value(self.into_json())
         .map_err(|e| Error::new(ErrorKind::Mismatch).with_userinfo(e.to_string()))
   }

   /// Ordered rows become arrays, named rows objects.
   pub fn into_json(self) -> JsonValue {
      match self {
         Row::Ordered(values) => JsonValue::Array(values),
         Row::Assoc(values) => JsonValue::Object(values.into_iter().collect()),
         Row::Object(values) => JsonValue::Object(values),
      }
   }

   pub(crate) fn into_object(self) -> Row {
      match self {
         Row::Assoc(values) => Row::Object(values.into_iter().collect()),
         other => other,
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   fn assoc() -> Row {
      Row::Assoc(IndexMap::from([
         ("id".to_string(), json!(1)),
         ("data".to_string(), json!("test1")),
      ]))
   }

   #[test]
   fn test_get_by_position_and_name() {
      let row = assoc();
      assert_eq!(row.get(1), Some(&json!("test1")));
      assert_eq!(row.get_by_name("id"), Some(&json!(1)));
      assert_eq!(Row::Ordered(vec![json!(1)]).get_by_name("id"), None);
   }

   #[test]
   fn test_deserialize_record() {
      #[derive(Deserialize)]
      struct Record {
         id: i64,
         data: String,
      }

      let record: Record = assoc().into_object().deserialize().unwrap();
      assert_eq!(record.id, 1);
      assert_eq!(record.data, "test1");
   }

   #[test]
   fn test_deserialize_ordered_as_tuple() {
      let (id, data): (i64, String) = Row::Ordered(vec![json!(2), json!("b")])
         .deserialize()
         .unwrap();
      assert_eq!((id, data), (2, "b".to_string()));
   }

   #[test]
   fn test_untagged_serialization() {
      assert_eq!(serde_json::to_value(assoc()).unwrap(), json!({"id": 1, "data": "test1"}));
      assert_eq!(
         serde_json::to_value(Row::Ordered(vec![json!(1)])).unwrap(),
         json!([1])
      );
   }
}
