use crate::shape::{coalesce, deep_find_by_key};
use crate::JsonValue;
use domstake_primitives::{BlockNumber, ItemIndex};
use serde::{Deserialize, Serialize};


#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub hash: String,
    pub parent_hash: String,
    pub height: BlockNumber,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub spec_name: Option<String>,
    #[serde(default)]
    pub spec_version: Option<u32>,
}


#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Extrinsic {
    pub index: ItemIndex,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub signature: Option<JsonValue>,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub hash: Option<String>,
}


impl Extrinsic {
    /// Address of the account that signed the extrinsic.
    ///
    /// Accepts both a plain address string and the `{__kind: "Id", value}`
    /// multi-address encoding.
    pub fn signer(&self) -> Option<&str> {
        let signature = self.signature.as_ref()?;
        let address = deep_find_by_key(signature, &["address", "signer"])?;
        let address = match address {
            JsonValue::Object(obj) => coalesce([obj.get("value"), obj.get("Id"), obj.get("id")])?,
            other => other
        };
        address.as_str()
    }
}


#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub extrinsic_index: ItemIndex,
    #[serde(default)]
    pub address: Vec<ItemIndex>,
    pub name: String,
    #[serde(default)]
    pub args: JsonValue,
    #[serde(default = "default_success")]
    pub success: bool,
}


impl Call {
    pub fn is(&self, pallet: &str, method: &str) -> bool {
        name_matches(&self.name, pallet, method)
    }
}


#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialization,
    ApplyExtrinsic,
    Finalization,
}


#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub index: ItemIndex,
    pub name: String,
    #[serde(default)]
    pub args: JsonValue,
    pub phase: Phase,
    #[serde(default)]
    pub extrinsic_index: Option<ItemIndex>,
    #[serde(default)]
    pub call_address: Option<Vec<ItemIndex>>,
}


impl Event {
    pub fn is(&self, pallet: &str, method: &str) -> bool {
        name_matches(&self.name, pallet, method)
    }

    /// Looks up an event argument by any of the given keys,
    /// or by position when the arguments are a plain list.
    pub fn arg(&self, keys: &[&str], position: usize) -> Option<&JsonValue> {
        match &self.args {
            JsonValue::Object(obj) => coalesce(keys.iter().map(|k| obj.get(*k))),
            JsonValue::Array(list) => list.get(position).filter(|v| !v.is_null()),
            _ => None
        }
    }
}


#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub header: BlockHeader,
    #[serde(default)]
    pub extrinsics: Vec<Extrinsic>,
    #[serde(default)]
    pub calls: Vec<Call>,
    #[serde(default)]
    pub events: Vec<Event>,
}


impl Block {
    pub fn extrinsic(&self, index: ItemIndex) -> Option<&Extrinsic> {
        self.extrinsics.iter().find(|e| e.index == index)
    }

    /// Finds the call that emitted the given event.
    ///
    /// Falls back to the first call of the same extrinsic matching `pallet.method`
    /// when the event carries no call address.
    pub fn call_of(&self, event: &Event, pallet: &str, method: &str) -> Option<&Call> {
        let extrinsic_index = event.extrinsic_index?;
        let mut candidates = self.calls.iter().filter(|c| {
            c.extrinsic_index == extrinsic_index && c.is(pallet, method)
        });
        match &event.call_address {
            Some(address) => candidates.find(|c| &c.address == address),
            None => candidates.next()
        }
    }
}


impl domstake_primitives::Block for Block {
    fn number(&self) -> BlockNumber {
        self.header.height
    }

    fn hash(&self) -> &str {
        &self.header.hash
    }

    fn parent_hash(&self) -> &str {
        &self.header.parent_hash
    }

    fn timestamp(&self) -> Option<i64> {
        self.header.timestamp
    }
}


fn default_success() -> bool {
    true
}


/// Matches `Pallet.method` names. Pallet names are compared case-insensitively,
/// because different chain decoders disagree on their casing.
fn name_matches(name: &str, pallet: &str, method: &str) -> bool {
    match name.split_once('.') {
        Some((p, m)) => p.eq_ignore_ascii_case(pallet) && m == method,
        None => false
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;


    #[test]
    fn event_names_ignore_pallet_case() {
        let event: Event = serde_json::from_value(json!({
            "index": 3,
            "name": "domains.OperatorNominated",
            "args": [7, "st9xyz"],
            "phase": "ApplyExtrinsic",
            "extrinsicIndex": 1
        })).unwrap();

        assert!(event.is("Domains", "OperatorNominated"));
        assert!(!event.is("Domains", "operatorNominated"));
        assert_eq!(event.arg(&["operatorId"], 0), Some(&json!(7)));
        assert_eq!(event.arg(&["nominatorId"], 1), Some(&json!("st9xyz")));
        assert_eq!(event.arg(&["amount"], 2), None);
    }

    #[test]
    fn signer_from_multi_address() {
        let extrinsic: Extrinsic = serde_json::from_value(json!({
            "index": 1,
            "version": 4,
            "signature": {
                "address": {"__kind": "Id", "value": "0xd43593c7"},
                "signature": {"__kind": "Sr25519", "value": "0x00"}
            }
        })).unwrap();
        assert_eq!(extrinsic.signer(), Some("0xd43593c7"));

        let unsigned: Extrinsic = serde_json::from_value(json!({"index": 0})).unwrap();
        assert_eq!(unsigned.signer(), None);
    }
}
