use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Marker byte written ahead of optional values and the reply error slot.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum Presence {
    Absent = 0,
    Present = 1,
}

impl Presence {
    #[inline]
    pub fn of<T>(value: &Option<T>) -> Self {
        match value {
            Some(_) => Presence::Present,
            None => Presence::Absent,
        }
    }
}
