use stubwire::constants::LENGTH_HEADER_SIZE;
use stubwire::{Decoder, Encoder, Marshal, Unmarshal};

pub const NANOS_PER_UNIT: i64 = 1_000_000_000;

/// An amount of money in one currency: whole `units` plus `nanos`
/// (billionths of a unit) carrying the same sign.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Money {
    pub currency_code: String,
    pub units: i64,
    pub nanos: i32,
}

impl Money {
    pub fn new(currency_code: impl Into<String>, units: i64, nanos: i32) -> Self {
        Self {
            currency_code: currency_code.into(),
            units,
            nanos,
        }
    }

    /// Splits a nanos total back into units and nanos.
    ///
    /// Returns `None` when the whole units do not fit an `i64`.
    pub fn from_total_nanos(currency_code: impl Into<String>, total: i128) -> Option<Self> {
        let per_unit = i128::from(NANOS_PER_UNIT);
        let units = i64::try_from(total / per_unit).ok()?;
        Some(Self::new(currency_code, units, (total % per_unit) as i32))
    }

    /// The whole amount in nanos. Widened so any `units` value fits.
    pub fn total_nanos(&self) -> i128 {
        i128::from(self.units) * i128::from(NANOS_PER_UNIT) + i128::from(self.nanos)
    }
}

impl Marshal for Money {
    fn marshal(&self, enc: &mut Encoder) {
        enc.string(&self.currency_code);
        enc.i64(self.units);
        enc.i32(self.nanos);
    }

    fn size_hint(&self) -> Option<usize> {
        Some(LENGTH_HEADER_SIZE + self.currency_code.len() + 8 + 4)
    }
}

impl Unmarshal for Money {
    fn unmarshal(dec: &mut Decoder<'_>) -> Self {
        Self {
            currency_code: dec.string(),
            units: dec.i64(),
            nanos: dec.i32(),
        }
    }
}
