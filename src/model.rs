//! Data model for device history records and the blocks that chain them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Canonical text of the genesis payload.
pub const GENESIS_PAYLOAD: &str = "Genesis Block";

/// One snapshot of a device's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub brand: String,
    pub model: String,
    /// Chain key. Not validated; an empty serial is its own chain.
    pub serial_number: String,
    pub supplier: String,
    pub is_sold: bool,
    pub buyer: String,
    pub buyer_id: String,
    pub is_stolen: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Record {
    /// Unsold, not stolen, no buyer.
    pub fn new(
        brand: impl Into<String>,
        model: impl Into<String>,
        serial_number: impl Into<String>,
        supplier: impl Into<String>,
    ) -> Self {
        RecordBuilder::new(brand, model, serial_number, supplier).build()
    }

    /// Revised copy of this record as produced by an edit.
    ///
    /// Serial number and supplier are carried over. The device counts as
    /// sold exactly when the amendment names a buyer.
    pub fn amend(&self, amendment: Amendment) -> Record {
        RecordBuilder::new(
            amendment.brand,
            amendment.model,
            self.serial_number.clone(),
            self.supplier.clone(),
        )
        .sold(!amendment.buyer.is_empty())
        .buyer(amendment.buyer)
        .buyer_id(amendment.buyer_id)
        .stolen(amendment.is_stolen)
        .build()
    }
}

/// Builder for [`Record`] with the optional status fields.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    brand: String,
    model: String,
    serial_number: String,
    supplier: String,
    is_sold: bool,
    buyer: String,
    buyer_id: String,
    is_stolen: bool,
}

impl RecordBuilder {
    pub fn new(
        brand: impl Into<String>,
        model: impl Into<String>,
        serial_number: impl Into<String>,
        supplier: impl Into<String>,
    ) -> Self {
        Self {
            brand: brand.into(),
            model: model.into(),
            serial_number: serial_number.into(),
            supplier: supplier.into(),
            is_sold: false,
            buyer: String::new(),
            buyer_id: String::new(),
            is_stolen: false,
        }
    }

    pub fn sold(mut self, is_sold: bool) -> Self {
        self.is_sold = is_sold;
        self
    }

    pub fn buyer(mut self, buyer: impl Into<String>) -> Self {
        self.buyer = buyer.into();
        self
    }

    pub fn buyer_id(mut self, buyer_id: impl Into<String>) -> Self {
        self.buyer_id = buyer_id.into();
        self
    }

    pub fn stolen(mut self, is_stolen: bool) -> Self {
        self.is_stolen = is_stolen;
        self
    }

    /// Stamp the record with the current time.
    pub fn build(self) -> Record {
        Record {
            brand: self.brand,
            model: self.model,
            serial_number: self.serial_number,
            supplier: self.supplier,
            is_sold: self.is_sold,
            buyer: self.buyer,
            buyer_id: self.buyer_id,
            is_stolen: self.is_stolen,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Fields a user may change when editing a device entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Amendment {
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub buyer: String,
    #[serde(default)]
    pub buyer_id: String,
    #[serde(default)]
    pub is_stolen: bool,
}

/// What a block carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Genesis(GenesisMarker),
    Device(Record),
}

/// Serializes as the bare string `"Genesis Block"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenesisMarker {
    #[serde(rename = "Genesis Block")]
    Genesis,
}

impl Payload {
    pub fn record(&self) -> Option<&Record> {
        match self {
            Payload::Genesis(_) => None,
            Payload::Device(record) => Some(record),
        }
    }

    /// Deterministic JSON text, record fields in declaration order.
    /// `created_at` is written as unix nanoseconds, so any offset or year encodes.
    pub fn canonical(&self) -> String {
        match self {
            Payload::Genesis(_) => json_str(GENESIS_PAYLOAD),
            Payload::Device(r) => format!(
                "{{\"brand\":{},\"model\":{},\"serial_number\":{},\"supplier\":{},\
                 \"is_sold\":{},\"buyer\":{},\"buyer_id\":{},\"is_stolen\":{},\"created_at\":{}}}",
                json_str(&r.brand),
                json_str(&r.model),
                json_str(&r.serial_number),
                json_str(&r.supplier),
                r.is_sold,
                json_str(&r.buyer),
                json_str(&r.buyer_id),
                r.is_stolen,
                r.created_at.unix_timestamp_nanos(),
            ),
        }
    }
}

/// Quoted, escaped JSON string literal.
fn json_str(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 0 for the genesis block; chain heads count up from there.
    pub sequence_index: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub payload: Payload,
    /// SHA-256 hex of the predecessor (empty for genesis).
    pub previous_hash: String,
    /// SHA-256 hex over (sequence_index, created_at, payload, previous_hash).
    pub hash: String,
}

impl Block {
    pub fn new(sequence_index: u64, payload: Payload, previous_hash: impl Into<String>) -> Self {
        Self::with_timestamp(
            sequence_index,
            OffsetDateTime::now_utc(),
            payload,
            previous_hash,
        )
    }

    pub fn with_timestamp(
        sequence_index: u64,
        created_at: OffsetDateTime,
        payload: Payload,
        previous_hash: impl Into<String>,
    ) -> Self {
        let previous_hash = previous_hash.into();
        let hash = compute_block_hash(sequence_index, created_at, &payload, &previous_hash);
        Self {
            sequence_index,
            created_at,
            payload,
            previous_hash,
            hash,
        }
    }

    pub fn genesis() -> Self {
        Self::new(0, Payload::Genesis(GenesisMarker::Genesis), "")
    }

    /// Digest of the fields as currently stored.
    pub fn recompute_hash(&self) -> String {
        compute_block_hash(
            self.sequence_index,
            self.created_at,
            &self.payload,
            &self.previous_hash,
        )
    }

    pub fn record(&self) -> Option<&Record> {
        self.payload.record()
    }
}

/// Hash inputs (concatenate as bytes, SHA-256) and return lowercase hex.
pub fn hash_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hex::encode(hasher.finalize())
}

/// Compute a block hash from its header fields.
/// Included: index (decimal), created_at (unix nanos), canonical payload, previous hash.
pub fn compute_block_hash(
    sequence_index: u64,
    created_at: OffsetDateTime,
    payload: &Payload,
    previous_hash: &str,
) -> String {
    hash_concat(&[
        sequence_index.to_string().as_bytes(),
        created_at.unix_timestamp_nanos().to_string().as_bytes(),
        payload.canonical().as_bytes(),
        previous_hash.as_bytes(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    fn sample() -> Record {
        let mut r = Record::new("Acme", "X1", "123", "Sup1");
        r.created_at = datetime!(2024-03-01 10:00:00 UTC);
        r
    }

    #[test]
    fn record_defaults() {
        let r = Record::new("Acme", "X1", "123", "Sup1");
        assert!(!r.is_sold);
        assert!(!r.is_stolen);
        assert_eq!(r.buyer, "");
        assert_eq!(r.buyer_id, "");
    }

    #[test]
    fn builder_sets_optional_fields() {
        let r = RecordBuilder::new("Acme", "X1", "123", "Sup1")
            .sold(true)
            .buyer("Jane")
            .buyer_id("V-1234")
            .stolen(true)
            .build();
        assert!(r.is_sold && r.is_stolen);
        assert_eq!(r.buyer, "Jane");
        assert_eq!(r.buyer_id, "V-1234");
    }

    #[test]
    fn empty_serial_is_accepted() {
        let r = Record::new("", "", "", "");
        assert_eq!(r.serial_number, "");
    }

    #[test]
    fn amend_keeps_serial_and_supplier() {
        let original = sample();
        let amended = original.amend(Amendment {
            brand: "Acme".into(),
            model: "X2".into(),
            buyer: "Jane".into(),
            buyer_id: "V-1".into(),
            is_stolen: false,
        });
        assert_eq!(amended.serial_number, "123");
        assert_eq!(amended.supplier, "Sup1");
        assert_eq!(amended.model, "X2");
        assert!(amended.is_sold);

        let unsold = original.amend(Amendment {
            brand: "Acme".into(),
            model: "X1".into(),
            is_stolen: true,
            ..Default::default()
        });
        assert!(!unsold.is_sold);
        assert!(unsold.is_stolen);
    }

    #[test]
    fn genesis_payload_text() {
        let g = Block::genesis();
        assert_eq!(g.sequence_index, 0);
        assert_eq!(g.previous_hash, "");
        assert_eq!(g.payload.canonical(), "\"Genesis Block\"");
        assert_eq!(
            serde_json::to_string(&g.payload).unwrap(),
            "\"Genesis Block\""
        );
    }

    #[test]
    fn hash_is_deterministic() {
        let at = datetime!(2024-03-01 12:00:00 UTC);
        let a = Block::with_timestamp(1, at, Payload::Device(sample()), "abc");
        let b = Block::with_timestamp(1, at, Payload::Device(sample()), "abc");
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 64);
        assert_eq!(a.recompute_hash(), a.hash);
    }

    #[test]
    fn any_field_change_changes_hash() {
        let at = datetime!(2024-03-01 12:00:00 UTC);
        let base = Block::with_timestamp(1, at, Payload::Device(sample()), "abc");

        let other_index = Block::with_timestamp(2, at, Payload::Device(sample()), "abc");
        let other_time = Block::with_timestamp(
            1,
            datetime!(2024-03-01 12:00:00.000000001 UTC),
            Payload::Device(sample()),
            "abc",
        );
        let mut stolen = sample();
        stolen.is_stolen = true;
        let other_payload = Block::with_timestamp(1, at, Payload::Device(stolen), "abc");
        let other_prev = Block::with_timestamp(1, at, Payload::Device(sample()), "abd");

        for changed in [&other_index, &other_time, &other_payload, &other_prev] {
            assert_ne!(changed.hash, base.hash);
        }
    }

    #[test]
    fn canonical_follows_field_order() {
        let text = Payload::Device(sample()).canonical();
        let brand = text.find("\"brand\"").unwrap();
        let serial = text.find("\"serial_number\"").unwrap();
        let created = text.find("\"created_at\"").unwrap();
        assert!(brand < serial && serial < created);
    }

    #[test]
    fn canonical_is_valid_json() {
        let mut r = sample();
        r.brand = "Ac\"me\\".into();
        let parsed: serde_json::Value =
            serde_json::from_str(&Payload::Device(r).canonical()).unwrap();
        assert_eq!(parsed["brand"], "Ac\"me\\");
        assert_eq!(parsed["is_sold"], false);
        assert_eq!(
            parsed["created_at"].as_i64().unwrap(),
            1_709_287_200_000_000_000
        );
    }

    #[test]
    fn canonical_covers_any_offset_and_year() {
        let mut odd_offset = sample();
        odd_offset.created_at = odd_offset.created_at.to_offset(offset!(+00:00:30));
        let mut odd_year = sample();
        odd_year.created_at = datetime!(-0001-01-01 0:00 UTC);

        let at = datetime!(-0001-01-01 0:00 UTC);
        let a = Block::with_timestamp(1, at, Payload::Device(odd_offset), "");
        let b = Block::with_timestamp(1, at, Payload::Device(odd_year), "");
        assert_eq!(a.recompute_hash(), a.hash);
        assert_ne!(a.hash, b.hash);

        // same instant, different offset: same canonical text
        assert_eq!(
            Payload::Device(sample()).canonical(),
            Payload::Device({
                let mut r = sample();
                r.created_at = r.created_at.to_offset(offset!(+05:30));
                r
            })
            .canonical()
        );
    }
}
