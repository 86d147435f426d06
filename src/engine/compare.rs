// SPDX-License-Identifier: MIT

//! Typed value comparison
//!
//! [`compare`] handles nil operands, values of the same kind, and numeric
//! values of different kinds. Numeric coercion never casts a negative signed
//! integer to unsigned: a negative signed value is always less than any
//! unsigned value.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::error::CompareError;
use super::value::{Numeric, Value, ValueKind};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperand {
    /// Unset operand; rejected before evaluation
    #[default]
    Invalid,
    /// ==
    #[serde(alias = "==")]
    Equal,
    /// !=
    #[serde(alias = "!=")]
    NotEqual,
    /// >
    #[serde(alias = ">")]
    GreaterThan,
    /// <
    #[serde(alias = "<")]
    LessThan,
    /// >=
    #[serde(alias = ">=")]
    GreaterThanOrEqual,
    /// <=
    #[serde(alias = "<=")]
    LessThanOrEqual,
}

impl ConditionOperand {
    /// The operand whose result is always the logical negation of this one
    pub fn negate(self) -> Self {
        match self {
            Self::Invalid => Self::Invalid,
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::GreaterThan => Self::LessThanOrEqual,
            Self::LessThanOrEqual => Self::GreaterThan,
            Self::LessThan => Self::GreaterThanOrEqual,
            Self::GreaterThanOrEqual => Self::LessThan,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Invalid => "<invalid>",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThanOrEqual => "<=",
        }
    }

    /// Apply the operand to an ordering. `None` means unordered (NaN), for
    /// which only `NotEqual` holds.
    fn matches(self, ordering: Option<Ordering>) -> bool {
        let Some(ordering) = ordering else {
            return self == Self::NotEqual;
        };
        match self {
            Self::Invalid => false,
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::GreaterThan => ordering == Ordering::Greater,
            Self::LessThan => ordering == Ordering::Less,
            Self::GreaterThanOrEqual => ordering != Ordering::Less,
            Self::LessThanOrEqual => ordering != Ordering::Greater,
        }
    }
}

impl std::fmt::Display for ConditionOperand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl std::str::FromStr for ConditionOperand {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "==" | "equal" => Ok(Self::Equal),
            "!=" | "not_equal" => Ok(Self::NotEqual),
            ">" | "greater_than" => Ok(Self::GreaterThan),
            "<" | "less_than" => Ok(Self::LessThan),
            ">=" | "greater_than_or_equal" => Ok(Self::GreaterThanOrEqual),
            "<=" | "less_than_or_equal" => Ok(Self::LessThanOrEqual),
            _ => Err(CompareError::InvalidOperand),
        }
    }
}

/// Compare two values with the given operand
pub fn compare(lhs: &Value, rhs: &Value, operand: ConditionOperand) -> Result<bool, CompareError> {
    if operand == ConditionOperand::Invalid {
        return Err(CompareError::InvalidOperand);
    }

    let lhs = lhs.resolved();
    let rhs = rhs.resolved();

    match (lhs.is_nil(), rhs.is_nil()) {
        (false, false) => {}
        (lhs_nil, rhs_nil) => {
            return match operand {
                ConditionOperand::Equal => Ok(lhs_nil && rhs_nil),
                ConditionOperand::NotEqual => Ok(lhs_nil != rhs_nil),
                _ => Err(CompareError::OperationNotSupported {
                    operand,
                    kind: ValueKind::Nil,
                }),
            };
        }
    }

    if let (Some(l), Some(r)) = (lhs.as_numeric(), rhs.as_numeric()) {
        return Ok(operand.matches(order_numeric(l, r)));
    }

    let incompatible = || CompareError::IncompatibleTypes {
        lhs: lhs.kind(),
        rhs: rhs.kind(),
    };

    match (lhs, rhs) {
        (Value::String(l), Value::String(r)) => Ok(operand.matches(Some(l.cmp(r)))),
        (Value::Record(l), Value::Record(r)) if l.type_name() != r.type_name() => {
            Err(incompatible())
        }
        (Value::Opaque(l), Value::Opaque(r)) if l.type_name() != r.type_name() => {
            Err(incompatible())
        }
        (Value::Bool(_), Value::Bool(_))
        | (Value::List(_), Value::List(_))
        | (Value::Map(_), Value::Map(_))
        | (Value::Record(_), Value::Record(_))
        | (Value::Opaque(_), Value::Opaque(_)) => match operand {
            ConditionOperand::Equal => Ok(lhs == rhs),
            ConditionOperand::NotEqual => Ok(lhs != rhs),
            _ => Err(CompareError::OperationNotSupported {
                operand,
                kind: lhs.kind(),
            }),
        },
        _ => Err(incompatible()),
    }
}

/// Order two widened numerics.
///
/// Mixed signed/unsigned pairs never cast a negative value. Pairs involving a
/// float are compared as `f64`, so integers above 2^53 may compare equal to
/// nearby floats.
fn order_numeric(lhs: Numeric, rhs: Numeric) -> Option<Ordering> {
    match (lhs, rhs) {
        (Numeric::Signed(l), Numeric::Signed(r)) => Some(l.cmp(&r)),
        (Numeric::Unsigned(l), Numeric::Unsigned(r)) => Some(l.cmp(&r)),
        (Numeric::Signed(l), Numeric::Unsigned(r)) => Some(match u64::try_from(l) {
            Ok(l) => l.cmp(&r),
            Err(_) => Ordering::Less,
        }),
        (Numeric::Unsigned(l), Numeric::Signed(r)) => Some(match u64::try_from(r) {
            Ok(r) => l.cmp(&r),
            Err(_) => Ordering::Greater,
        }),
        (l, r) => l.as_f64().partial_cmp(&r.as_f64()),
    }
}

/// Order two values for aggregation (min/max): numerics and strings only
pub(crate) fn order(lhs: &Value, rhs: &Value) -> Result<Ordering, CompareError> {
    if compare(lhs, rhs, ConditionOperand::LessThan)? {
        Ok(Ordering::Less)
    } else if compare(lhs, rhs, ConditionOperand::GreaterThan)? {
        Ok(Ordering::Greater)
    } else {
        Ok(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::Record;
    use std::sync::Arc;

    use ConditionOperand::*;

    const ALL: [ConditionOperand; 6] = [
        Equal,
        NotEqual,
        GreaterThan,
        LessThan,
        GreaterThanOrEqual,
        LessThanOrEqual,
    ];

    fn sample_values() -> Vec<Value> {
        vec![
            Value::I8(-3),
            Value::I64(i64::MIN),
            Value::U8(0),
            Value::U64(u64::MAX),
            Value::F32(1.5),
            Value::F64(-0.25),
            Value::from("abc"),
            Value::Bool(true),
            Value::List(vec![Value::I32(1)]),
            Value::Record(Record::new("T").with_field("a", 1)),
            Value::Nil,
        ]
    }

    #[test]
    fn test_invalid_operand_rejected() {
        assert_eq!(
            compare(&Value::I32(1), &Value::I32(1), Invalid),
            Err(CompareError::InvalidOperand)
        );
    }

    #[test]
    fn test_reflexivity() {
        for v in sample_values() {
            assert_eq!(compare(&v, &v, Equal), Ok(true), "{:?}", v);
            assert_eq!(compare(&v, &v, NotEqual), Ok(false), "{:?}", v);
        }
    }

    #[test]
    fn test_negation_property() {
        let values = [
            Value::I8(-3),
            Value::I32(7),
            Value::U16(7),
            Value::U64(u64::MAX),
            Value::F32(7.0),
            Value::F64(-100.5),
        ];
        for a in &values {
            for b in &values {
                for op in ALL {
                    let direct = compare(a, b, op).unwrap();
                    let negated = compare(a, b, op.negate()).unwrap();
                    assert_eq!(direct, !negated, "{:?} {} {:?}", a, op, b);
                }
            }
        }
    }

    #[test]
    fn test_negative_signed_below_any_unsigned() {
        for s in [Value::I8(-1), Value::I32(-1), Value::I64(i64::MIN)] {
            for u in [Value::U8(0), Value::U32(1), Value::U64(u64::MAX)] {
                assert_eq!(compare(&s, &u, LessThan), Ok(true));
                assert_eq!(compare(&s, &u, LessThanOrEqual), Ok(true));
                assert_eq!(compare(&s, &u, GreaterThan), Ok(false));
                assert_eq!(compare(&s, &u, GreaterThanOrEqual), Ok(false));
                assert_eq!(compare(&s, &u, Equal), Ok(false));
                assert_eq!(compare(&s, &u, NotEqual), Ok(true));

                assert_eq!(compare(&u, &s, GreaterThan), Ok(true));
                assert_eq!(compare(&u, &s, GreaterThanOrEqual), Ok(true));
                assert_eq!(compare(&u, &s, LessThan), Ok(false));
                assert_eq!(compare(&u, &s, LessThanOrEqual), Ok(false));
            }
        }
    }

    #[test]
    fn test_int32_negative_one_less_than_uint64_one() {
        assert_eq!(compare(&Value::I32(-1), &Value::U64(1), LessThan), Ok(true));
    }

    #[test]
    fn test_non_negative_signed_widened_to_unsigned() {
        assert_eq!(compare(&Value::I64(5), &Value::U8(5), Equal), Ok(true));
        assert_eq!(compare(&Value::I16(6), &Value::U8(5), GreaterThan), Ok(true));
        assert_eq!(compare(&Value::U32(4), &Value::I8(5), LessThan), Ok(true));
    }

    #[test]
    fn test_cross_width_same_family() {
        assert_eq!(compare(&Value::I8(-5), &Value::I64(-5), Equal), Ok(true));
        assert_eq!(compare(&Value::U8(25), &Value::U64(256), LessThan), Ok(true));
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(compare(&Value::I8(3), &Value::F64(2.5), GreaterThan), Ok(true));
        assert_eq!(compare(&Value::F32(0.5), &Value::F64(0.5), Equal), Ok(true));
        assert_eq!(compare(&Value::U64(1), &Value::F32(1.0), Equal), Ok(true));
    }

    #[test]
    fn test_nan_is_unordered() {
        let nan = Value::F64(f64::NAN);
        assert_eq!(compare(&nan, &nan, Equal), Ok(false));
        assert_eq!(compare(&nan, &nan, NotEqual), Ok(true));
        assert_eq!(compare(&nan, &Value::I32(1), LessThan), Ok(false));
        assert_eq!(compare(&nan, &Value::I32(1), GreaterThanOrEqual), Ok(false));
    }

    #[test]
    fn test_nil_handling() {
        assert_eq!(compare(&Value::Nil, &Value::Nil, Equal), Ok(true));
        assert_eq!(compare(&Value::Nil, &Value::I32(1), Equal), Ok(false));
        assert_eq!(compare(&Value::I32(1), &Value::Nil, NotEqual), Ok(true));
        assert_eq!(compare(&Value::Nil, &Value::Nil, NotEqual), Ok(false));
        assert_eq!(
            compare(&Value::I32(1), &Value::Nil, GreaterThan),
            Err(CompareError::OperationNotSupported {
                operand: GreaterThan,
                kind: ValueKind::Nil,
            })
        );
    }

    #[test]
    fn test_empty_ref_is_nil() {
        let empty = Value::Ref(Arc::new(Value::Nil));
        assert_eq!(compare(&empty, &Value::Nil, Equal), Ok(true));
        let five = Value::Ref(Arc::new(Value::I32(5)));
        assert_eq!(compare(&five, &Value::I64(4), GreaterThan), Ok(true));
    }

    #[test]
    fn test_strings_ordered() {
        let (a, b) = (Value::from("a"), Value::from("b"));
        assert_eq!(compare(&a, &b, LessThan), Ok(true));
        assert_eq!(compare(&b, &b, GreaterThanOrEqual), Ok(true));
        assert_eq!(compare(&b, &a, LessThanOrEqual), Ok(false));
    }

    #[test]
    fn test_bool_equality_only() {
        let (yes, no) = (Value::Bool(true), Value::Bool(false));
        assert_eq!(compare(&yes, &no, NotEqual), Ok(true));
        assert_eq!(
            compare(&yes, &no, GreaterThan),
            Err(CompareError::OperationNotSupported {
                operand: GreaterThan,
                kind: ValueKind::Bool,
            })
        );
    }

    #[test]
    fn test_aggregates_deep_equality() {
        let a = Value::List(vec![Value::from("x"), Value::I32(1)]);
        let b = Value::List(vec![Value::from("x"), Value::I32(1)]);
        let c = Value::List(vec![Value::from("x")]);
        assert_eq!(compare(&a, &b, Equal), Ok(true));
        assert_eq!(compare(&a, &c, NotEqual), Ok(true));
        assert!(compare(&a, &b, LessThan).is_err());
    }

    #[test]
    fn test_opaque_identity() {
        let a = Value::opaque(1_u32);
        let b = Value::opaque(1_u32);
        assert_eq!(compare(&a, &a.clone(), Equal), Ok(true));
        assert_eq!(compare(&a, &b, Equal), Ok(false));
    }

    #[test]
    fn test_records_of_different_types_are_incompatible() {
        let order = Value::Record(Record::new("Order").with_field("id", 1));
        let user = Value::Record(Record::new("User").with_field("id", 1));
        let incompatible = Err(CompareError::IncompatibleTypes {
            lhs: ValueKind::Record,
            rhs: ValueKind::Record,
        });
        assert_eq!(compare(&order, &user, Equal), incompatible);
        assert_eq!(compare(&order, &user, NotEqual), incompatible);

        let other_order = Value::Record(Record::new("Order").with_field("id", 2));
        assert_eq!(compare(&order, &other_order, NotEqual), Ok(true));
    }

    #[test]
    fn test_opaques_of_different_types_are_incompatible() {
        let number = Value::opaque(1_u32);
        let text = Value::opaque(String::from("1"));
        assert_eq!(
            compare(&number, &text, Equal),
            Err(CompareError::IncompatibleTypes {
                lhs: ValueKind::Opaque,
                rhs: ValueKind::Opaque,
            })
        );
        assert!(compare(&text, &number, NotEqual).is_err());
    }

    #[test]
    fn test_incompatible_types() {
        assert_eq!(
            compare(&Value::from("1"), &Value::I32(1), Equal),
            Err(CompareError::IncompatibleTypes {
                lhs: ValueKind::String,
                rhs: ValueKind::I32,
            })
        );
        assert!(compare(&Value::Bool(true), &Value::I8(1), Equal).is_err());
    }

    #[test]
    fn test_operand_parse_and_display() {
        assert_eq!(">=".parse::<ConditionOperand>(), Ok(GreaterThanOrEqual));
        assert_eq!("not_equal".parse::<ConditionOperand>(), Ok(NotEqual));
        assert!("~".parse::<ConditionOperand>().is_err());
        assert_eq!(LessThanOrEqual.to_string(), "<=");

        let op: ConditionOperand = serde_json::from_str("\"<\"").unwrap();
        assert_eq!(op, LessThan);
        assert_eq!(ConditionOperand::default(), Invalid);
    }

    #[test]
    fn test_order_for_aggregation() {
        assert_eq!(order(&Value::I32(1), &Value::U8(2)), Ok(Ordering::Less));
        let (a, b) = (Value::from("a"), Value::from("b"));
        assert_eq!(order(&b, &a), Ok(Ordering::Greater));
        assert!(order(&Value::Bool(true), &Value::Bool(true)).is_err());
    }
}
