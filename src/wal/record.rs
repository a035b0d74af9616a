//! Logical content of a log record
//!
//! ```text
//! +----+-------+----------+---------+-----+-----------+-------+
//! | op | cf_id | sequence | key_len | key | value_len | value |
//! +----+-------+----------+---------+-----+-----------+-------+
//! | 1  | 4     | 8        | 4       | N   | 4         | M     |
//! +----+-------+----------+---------+-----+-----------+-------+
//! ```
//!
//! The value part is only present for puts. Integers are little endian.

use crate::util::{Result, Status};

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    pub cf_id: u32,
    pub sequence: u64,
    pub key: Vec<u8>,
    /// `None` for a deletion.
    pub value: Option<Vec<u8>>,
}

impl WalRecord {
    pub fn put(cf_id: u32, sequence: u64, key: &[u8], value: &[u8]) -> Self {
        WalRecord {
            cf_id,
            sequence,
            key: key.to_vec(),
            value: Some(value.to_vec()),
        }
    }

    pub fn delete(cf_id: u32, sequence: u64, key: &[u8]) -> Self {
        WalRecord {
            cf_id,
            sequence,
            key: key.to_vec(),
            value: None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let value_len = self.value.as_ref().map_or(0, |v| 4 + v.len());
        let mut buf = Vec::with_capacity(17 + self.key.len() + value_len);

        buf.push(if self.value.is_some() { OP_PUT } else { OP_DELETE });
        buf.extend_from_slice(&self.cf_id.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.key);
        if let Some(value) = &self.value {
            buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
            buf.extend_from_slice(value);
        }
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor { data, pos: 0 };

        let op = cursor.take(1)?[0];
        let cf_id = u32::from_le_bytes(cursor.array()?);
        let sequence = u64::from_le_bytes(cursor.array()?);
        let key_len = u32::from_le_bytes(cursor.array()?) as usize;
        let key = cursor.take(key_len)?.to_vec();

        let value = match op {
            OP_PUT => {
                let value_len = u32::from_le_bytes(cursor.array()?) as usize;
                Some(cursor.take(value_len)?.to_vec())
            },
            OP_DELETE => None,
            other => {
                return Err(Status::corruption(format!("Unknown record op {other}")));
            },
        };

        if cursor.pos != data.len() {
            return Err(Status::corruption("Trailing bytes after record"));
        }

        Ok(WalRecord {
            cf_id,
            sequence,
            key,
            value,
        })
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| Status::corruption("Record too short"))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_delete_decode() {
        let put = WalRecord::put(3, 42, b"key", b"value");
        assert_eq!(WalRecord::decode(&put.encode()).unwrap(), put);

        let delete = WalRecord::delete(0, 43, b"key");
        let encoded = delete.encode();
        assert_eq!(encoded.len(), 17 + 3);
        assert_eq!(WalRecord::decode(&encoded).unwrap(), delete);
    }

    #[test]
    fn test_decode_rejects_damage() {
        let encoded = WalRecord::put(1, 1, b"key", b"value").encode();

        assert!(WalRecord::decode(&encoded[..encoded.len() - 1])
            .unwrap_err()
            .is_corruption());

        let mut bad_op = encoded.clone();
        bad_op[0] = 9;
        assert!(WalRecord::decode(&bad_op).unwrap_err().is_corruption());

        let mut trailing = encoded;
        trailing.push(0);
        assert!(WalRecord::decode(&trailing).unwrap_err().is_corruption());
    }
}
