//! Policy violation flags.

use std::fmt;

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single policy violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertFlag {
    /// Reported state contradicts the physical state of the same event.
    Spoofing,
    /// A physical transition was not reflected in the report.
    Masking,
    /// The report travelled over an insecure transport.
    TlsViolation,
}

impl AlertFlag {
    /// All flags in canonical order.
    pub const ALL: [Self; 3] = [Self::Spoofing, Self::Masking, Self::TlsViolation];

    /// Returns the wire name of this flag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Spoofing => "spoofing",
            Self::Masking => "masking",
            Self::TlsViolation => "tls_violation",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Spoofing => 0b001,
            Self::Masking => 0b010,
            Self::TlsViolation => 0b100,
        }
    }
}

impl fmt::Display for AlertFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The set of flags raised for one event. Empty means OK.
///
/// Serializes as a JSON array of flag names in canonical order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AlertSet(u8);

impl AlertSet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Adds a flag.
    pub fn insert(&mut self, flag: AlertFlag) {
        self.0 |= flag.bit();
    }

    /// Returns a copy with `flag` added.
    #[must_use]
    pub const fn with(self, flag: AlertFlag) -> Self {
        Self(self.0 | flag.bit())
    }

    /// Whether `flag` is present.
    #[must_use]
    pub const fn contains(&self, flag: AlertFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Whether no flag is raised.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of raised flags.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates the raised flags in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = AlertFlag> + '_ {
        AlertFlag::ALL.into_iter().filter(|f| self.contains(*f))
    }
}

impl FromIterator<AlertFlag> for AlertSet {
    fn from_iter<I: IntoIterator<Item = AlertFlag>>(iter: I) -> Self {
        let mut set = Self::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl fmt::Display for AlertSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "OK");
        }
        let names: Vec<&str> = self.iter().map(|flag| flag.as_str()).collect();
        write!(f, "{}", names.join(", "))
    }
}

impl Serialize for AlertSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for flag in self.iter() {
            seq.serialize_element(&flag)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for AlertSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AlertSetVisitor;

        impl<'de> Visitor<'de> for AlertSetVisitor {
            type Value = AlertSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of alert flag names")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<AlertSet, A::Error> {
                let mut set = AlertSet::empty();
                while let Some(flag) = seq.next_element::<AlertFlag>()? {
                    set.insert(flag);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_seq(AlertSetVisitor)
    }
}
