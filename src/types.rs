//! Identifiers, timestamps and the catalog records the request workflow reads
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// newtype wrappers over the store's u64 ids. minicbor has no derive for
// tuple newtypes that encodes them bare, so the impls are written by hand.
macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Big-endian key bytes, so sled iterates ids in numeric order.
            pub fn to_key(self) -> [u8; 8] {
                self.0.to_be_bytes()
            }
            pub fn from_key(key: &[u8]) -> Option<Self> {
                let bytes: [u8; 8] = key.try_into().ok()?;
                Some(Self(u64::from_be_bytes(bytes)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} {}", $label, self.0)
            }
        }

        impl<C> minicbor::Encode<C> for $name {
            fn encode<W: minicbor::encode::Write>(
                &self,
                e: &mut minicbor::Encoder<W>,
                _: &mut C,
            ) -> Result<(), minicbor::encode::Error<W::Error>> {
                e.u64(self.0)?.ok()
            }
        }

        impl<'b, C> minicbor::Decode<'b, C> for $name {
            fn decode(
                d: &mut minicbor::Decoder<'b>,
                _: &mut C,
            ) -> Result<Self, minicbor::decode::Error> {
                Ok(Self(d.u64()?))
            }
        }
    };
}

record_id!(
    /// Identifies a medicine request (the "requestor" row)
    RequestId,
    "request"
);
record_id!(
    /// Identifies one line item inside a request
    ItemId,
    "item"
);
record_id!(MedicineId, "medicine");
record_id!(UserId, "user");

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<Utc> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value.with_timezone(&Utc))
    }
}

impl Serialize for TimeStamp<Utc> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Account state; only `Approved` users may submit requests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
    #[n(2)]
    Deactive,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UserStatus::Pending => "PENDING",
            UserStatus::Approved => "APPROVED",
            UserStatus::Deactive => "DEACTIVE",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[n(0)]
    pub id: UserId,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub username: String,
    #[n(3)]
    pub status: UserStatus,
    #[n(4)]
    pub created_at: TimeStamp<Utc>,
}

impl User {
    pub fn new(id: UserId, name: &str, username: &str, status: UserStatus) -> Self {
        Self {
            id,
            name: name.to_owned(),
            username: username.to_owned(),
            status,
            created_at: TimeStamp::new(),
        }
    }
}

/// An inventory item. `stock` is only moved by the stock ledger once a
/// request is dispensed or a dispensed request is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    #[n(0)]
    pub id: MedicineId,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub brand: String,
    #[n(3)]
    pub stock: u32,
    #[n(4)]
    pub expiry_date: Option<TimeStamp<Utc>>,
    #[n(5)]
    pub recommended: bool,
    #[n(6)]
    pub categories: Vec<String>,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
    #[n(8)]
    pub updated_at: TimeStamp<Utc>,
}

impl Medicine {
    pub fn new(id: MedicineId, name: &str, brand: &str, stock: u32) -> Self {
        let now = TimeStamp::new();
        Self {
            id,
            name: name.to_owned(),
            brand: brand.to_owned(),
            stock,
            expiry_date: None,
            recommended: false,
            categories: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
    pub fn with_category(mut self, category: &str) -> Self {
        self.categories.push(category.to_owned());
        self
    }
    pub fn set_recommended(mut self, recommended: bool) -> Self {
        self.recommended = recommended;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn id_keys_sort_numerically() {
        let low = MedicineId(2).to_key();
        let high = MedicineId(256).to_key();

        assert!(low < high);
        assert_eq!(MedicineId::from_key(&high), Some(MedicineId(256)));
        assert_eq!(MedicineId::from_key(&[1, 2, 3]), None);
    }

    #[test]
    fn medicine_record_survives_cbor() {
        let medicine = Medicine::new(MedicineId(7), "Paracetamol", "Biogesic", 10)
            .with_category("Analgesic")
            .set_recommended(true);

        let bytes = minicbor::to_vec(&medicine).unwrap();
        let decoded: Medicine = minicbor::decode(&bytes).unwrap();

        assert_eq!(medicine, decoded);
    }
}
