//! Value kinds of formula expressions.
//!
//! Every kind except `NULL` and `UNSUPPORTED` comes in a pair: the runtime
//! kind (`INTEGER`) and its compile-time-constant twin (`CONST_INTEGER`).
//! The autocast table decides which kinds a value may stand in for without
//! an explicit conversion. It is closed, tag-driven and not symmetric.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A closed enumeration of value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum DataType {
    Boolean,
    Integer,
    Float,
    String,
    Date,
    Datetime,
    #[serde(rename = "DATETIMETZ")]
    DatetimeTz,
    #[serde(rename = "GENERICDATETIME")]
    GenericDatetime,
    Geopoint,
    Geopolygon,
    Uuid,
    Markup,
    ArrayInt,
    ArrayFloat,
    ArrayStr,
    TreeStr,
    ConstBoolean,
    ConstInteger,
    ConstFloat,
    ConstString,
    ConstDate,
    ConstDatetime,
    #[serde(rename = "CONST_DATETIMETZ")]
    ConstDatetimeTz,
    #[serde(rename = "CONST_GENERICDATETIME")]
    ConstGenericDatetime,
    ConstGeopoint,
    ConstGeopolygon,
    ConstUuid,
    ConstMarkup,
    ConstArrayInt,
    ConstArrayFloat,
    ConstArrayStr,
    ConstTreeStr,
    Null,
    Unsupported,
}

/// Number of runtime kinds that have a `CONST_*` twin.
const PAIRED: u8 = 16;

bitflags! {
    /// A set of [`DataType`]s, one bit per kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeSet: u64 {
        const _ = !0;
    }
}

impl TypeSet {
    /// Build a set from a list of kinds.
    pub const fn of(types: &[DataType]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < types.len() {
            bits |= types[i].as_set().bits();
            i += 1;
        }
        TypeSet::from_bits_retain(bits)
    }

    /// Every kind, including `NULL` and `UNSUPPORTED`.
    pub const fn every() -> Self {
        TypeSet::of(&DataType::ALL)
    }

    /// Whether `t` is a member.
    pub const fn has(self, t: DataType) -> bool {
        self.bits() & t.as_set().bits() != 0
    }

    /// Extend the set with the const and non-const form of every member.
    pub const fn with_const_pairs(self) -> Self {
        let mut bits = self.bits();
        let mut i = 0;
        while i < DataType::ALL.len() {
            let t = DataType::ALL[i];
            if self.has(t) {
                bits |= t.as_set().bits() | t.non_const().as_set().bits();
                if let Some(c) = t.non_const().const_twin() {
                    bits |= c.as_set().bits();
                }
            }
            i += 1;
        }
        TypeSet::from_bits_retain(bits)
    }

    /// Iterate the member kinds in declaration order.
    pub fn types(self) -> impl Iterator<Item = DataType> {
        DataType::ALL.into_iter().filter(move |t| self.has(*t))
    }
}

impl From<DataType> for TypeSet {
    fn from(t: DataType) -> Self {
        t.as_set()
    }
}

impl FromIterator<DataType> for TypeSet {
    fn from_iter<I: IntoIterator<Item = DataType>>(iter: I) -> Self {
        iter.into_iter()
            .fold(TypeSet::empty(), |acc, t| acc | t.as_set())
    }
}

impl DataType {
    /// All kinds in declaration order.
    pub const ALL: [DataType; 34] = [
        DataType::Boolean,
        DataType::Integer,
        DataType::Float,
        DataType::String,
        DataType::Date,
        DataType::Datetime,
        DataType::DatetimeTz,
        DataType::GenericDatetime,
        DataType::Geopoint,
        DataType::Geopolygon,
        DataType::Uuid,
        DataType::Markup,
        DataType::ArrayInt,
        DataType::ArrayFloat,
        DataType::ArrayStr,
        DataType::TreeStr,
        DataType::ConstBoolean,
        DataType::ConstInteger,
        DataType::ConstFloat,
        DataType::ConstString,
        DataType::ConstDate,
        DataType::ConstDatetime,
        DataType::ConstDatetimeTz,
        DataType::ConstGenericDatetime,
        DataType::ConstGeopoint,
        DataType::ConstGeopolygon,
        DataType::ConstUuid,
        DataType::ConstMarkup,
        DataType::ConstArrayInt,
        DataType::ConstArrayFloat,
        DataType::ConstArrayStr,
        DataType::ConstTreeStr,
        DataType::Null,
        DataType::Unsupported,
    ];

    /// Singleton set holding this kind.
    pub const fn as_set(self) -> TypeSet {
        TypeSet::from_bits_retain(1u64 << (self as u8))
    }

    pub const fn is_const(self) -> bool {
        let idx = self as u8;
        idx >= PAIRED && idx < 2 * PAIRED
    }

    /// The runtime form of a const kind; other kinds map to themselves.
    pub const fn non_const(self) -> DataType {
        if self.is_const() {
            DataType::ALL[(self as u8 - PAIRED) as usize]
        } else {
            self
        }
    }

    /// The `CONST_*` twin, if this kind has one.
    pub const fn const_twin(self) -> Option<DataType> {
        let idx = self as u8;
        if idx < PAIRED {
            Some(DataType::ALL[(idx + PAIRED) as usize])
        } else if self.is_const() {
            Some(self)
        } else {
            None
        }
    }

    /// Kinds a runtime value of this kind may be treated as, before const pairing.
    const fn base_autocast(self) -> TypeSet {
        match self {
            DataType::Boolean => {
                TypeSet::of(&[DataType::Boolean, DataType::Integer, DataType::Float])
            }
            DataType::Integer => TypeSet::of(&[DataType::Integer, DataType::Float]),
            DataType::DatetimeTz => TypeSet::of(&[DataType::DatetimeTz, DataType::Datetime]),
            other => other.as_set(),
        }
    }

    /// The set of kinds a value of this kind may be treated as without a cast.
    ///
    /// Always contains the kind itself and its const/non-const twin.
    pub const fn autocast_types(self) -> TypeSet {
        match self {
            DataType::Null => TypeSet::every(),
            DataType::Unsupported => DataType::Unsupported.as_set(),
            t if t.is_const() => t.non_const().base_autocast().with_const_pairs(),
            t => {
                let own = match t.const_twin() {
                    Some(c) => c.as_set(),
                    None => TypeSet::empty(),
                };
                t.base_autocast().union(own)
            }
        }
    }

    /// Whether a value of this kind may be used where `other` is expected.
    pub const fn casts_to(self, other: DataType) -> bool {
        self.autocast_types().has(other)
    }

    pub const fn is_array(self) -> bool {
        matches!(
            self.non_const(),
            DataType::ArrayInt | DataType::ArrayFloat | DataType::ArrayStr | DataType::TreeStr
        )
    }

    pub const fn is_temporal(self) -> bool {
        matches!(
            self.non_const(),
            DataType::Date | DataType::Datetime | DataType::DatetimeTz | DataType::GenericDatetime
        )
    }

    /// Canonical upper-case name, as used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::String => "STRING",
            DataType::Date => "DATE",
            DataType::Datetime => "DATETIME",
            DataType::DatetimeTz => "DATETIMETZ",
            DataType::GenericDatetime => "GENERICDATETIME",
            DataType::Geopoint => "GEOPOINT",
            DataType::Geopolygon => "GEOPOLYGON",
            DataType::Uuid => "UUID",
            DataType::Markup => "MARKUP",
            DataType::ArrayInt => "ARRAY_INT",
            DataType::ArrayFloat => "ARRAY_FLOAT",
            DataType::ArrayStr => "ARRAY_STR",
            DataType::TreeStr => "TREE_STR",
            DataType::ConstBoolean => "CONST_BOOLEAN",
            DataType::ConstInteger => "CONST_INTEGER",
            DataType::ConstFloat => "CONST_FLOAT",
            DataType::ConstString => "CONST_STRING",
            DataType::ConstDate => "CONST_DATE",
            DataType::ConstDatetime => "CONST_DATETIME",
            DataType::ConstDatetimeTz => "CONST_DATETIMETZ",
            DataType::ConstGenericDatetime => "CONST_GENERICDATETIME",
            DataType::ConstGeopoint => "CONST_GEOPOINT",
            DataType::ConstGeopolygon => "CONST_GEOPOLYGON",
            DataType::ConstUuid => "CONST_UUID",
            DataType::ConstMarkup => "CONST_MARKUP",
            DataType::ConstArrayInt => "CONST_ARRAY_INT",
            DataType::ConstArrayFloat => "CONST_ARRAY_FLOAT",
            DataType::ConstArrayStr => "CONST_ARRAY_STR",
            DataType::ConstTreeStr => "CONST_TREE_STR",
            DataType::Null => "NULL",
            DataType::Unsupported => "UNSUPPORTED",
        }
    }

    /// The narrowest kind every input autocasts into.
    ///
    /// `NULL` inputs are ignored; the result is const only if all remaining
    /// inputs are const. Returns `Some(NULL)` for an all-NULL (or empty) input.
    pub fn common_type(types: &[DataType]) -> Option<DataType> {
        let informative: Vec<DataType> = types
            .iter()
            .copied()
            .filter(|t| *t != DataType::Null)
            .collect();
        if informative.is_empty() {
            return Some(DataType::Null);
        }

        let all_const = informative.iter().all(|t| t.is_const());
        let mut candidates: Vec<DataType> = Vec::new();
        for t in &informative {
            for cand in t.non_const().autocast_types().types() {
                if !cand.is_const() && !candidates.contains(&cand) {
                    candidates.push(cand);
                }
            }
        }

        let common = candidates
            .into_iter()
            .find(|cand| informative.iter().all(|t| t.casts_to(*cand)))?;
        if all_const {
            common.const_twin().or(Some(common))
        } else {
            Some(common)
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters attached to a resolved type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataTypeParams {
    /// Explicit timezone name for timezone-bearing kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl DataTypeParams {
    pub fn with_timezone(timezone: impl Into<String>) -> Self {
        Self {
            timezone: Some(timezone.into()),
        }
    }
}
