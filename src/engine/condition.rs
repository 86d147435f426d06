// SPDX-License-Identifier: MIT

//! Boolean condition trees
//!
//! Leaves compare two built values (with the comparator or with a typed user
//! function); `And`/`Or` combine children left to right and stop at the
//! first child that decides the result. Errors are never swallowed by
//! short-circuiting: a child that fails before the decision is reached fails
//! the whole condition.

use std::sync::Arc;

use super::builder::ValueBuilder;
use super::compare::{compare, ConditionOperand};
use super::context::PipelineContext;
use super::error::{BoxError, ConditionError, Side};
use super::value::{Value, ValueType};

/// A condition that evaluates to true or false against a context
#[derive(Debug, Clone)]
pub enum Condition {
    /// Compare two built values with an operand
    Value(ValueCondition),
    /// True only if every child is true; empty is true
    And(Vec<Condition>),
    /// True if any child is true; empty is false
    Or(Vec<Condition>),
    /// Logical negation of the child
    Not(Box<Condition>),
    /// Compare two built values with a typed user function
    Custom(CustomCompareCondition),
}

impl Condition {
    pub fn compare(lhs: ValueBuilder, operand: ConditionOperand, rhs: ValueBuilder) -> Self {
        Condition::Value(ValueCondition::new(lhs, operand, rhs))
    }

    pub fn and(children: impl IntoIterator<Item = Condition>) -> Self {
        Condition::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Or(children.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Condition) -> Self {
        Condition::Not(Box::new(child))
    }

    pub fn evaluate(&self, ctx: &PipelineContext) -> Result<bool, ConditionError> {
        match self {
            Condition::Value(condition) => condition.evaluate(ctx),
            Condition::And(children) => {
                for child in children {
                    if !child.evaluate(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(children) => {
                for child in children {
                    if child.evaluate(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not(child) => Ok(!child.evaluate(ctx)?),
            Condition::Custom(condition) => condition.evaluate(ctx),
        }
    }
}

impl From<ValueCondition> for Condition {
    fn from(condition: ValueCondition) -> Self {
        Condition::Value(condition)
    }
}

impl From<CustomCompareCondition> for Condition {
    fn from(condition: CustomCompareCondition) -> Self {
        Condition::Custom(condition)
    }
}

fn build_side(
    side: Side,
    builder: &Option<ValueBuilder>,
    ctx: &PipelineContext,
) -> Result<Value, ConditionError> {
    let Some(builder) = builder else {
        let message = format!("{} builder is missing", side);
        return Err(ConditionError::InvalidCondition(message));
    };
    builder
        .build(ctx)
        .map_err(|source| ConditionError::Build { side, source })
}

// ---------------------------------------------------------------------------
// Comparator-backed leaf
// ---------------------------------------------------------------------------

/// Compares a left-hand value to a right-hand value with an operand
#[derive(Debug, Clone, Default)]
pub struct ValueCondition {
    pub lhs: Option<ValueBuilder>,
    pub rhs: Option<ValueBuilder>,
    pub operand: ConditionOperand,
}

impl ValueCondition {
    pub fn new(lhs: ValueBuilder, operand: ConditionOperand, rhs: ValueBuilder) -> Self {
        Self {
            lhs: Some(lhs),
            rhs: Some(rhs),
            operand,
        }
    }

    pub fn evaluate(&self, ctx: &PipelineContext) -> Result<bool, ConditionError> {
        if self.operand == ConditionOperand::Invalid {
            return Err(ConditionError::InvalidCondition("operand is not set".to_string()));
        }
        let lhs = build_side(Side::Lhs, &self.lhs, ctx)?;
        let rhs = build_side(Side::Rhs, &self.rhs, ctx)?;
        Ok(compare(&lhs, &rhs, self.operand)?)
    }
}

// ---------------------------------------------------------------------------
// User-function leaf
// ---------------------------------------------------------------------------

type CompareFn = dyn Fn(&Value, &Value) -> Result<bool, ConditionError> + Send + Sync;

/// A typed comparison function with its type erased.
///
/// The function only runs once both values narrow to its declared type.
#[derive(Clone)]
pub struct CustomComparison {
    type_name: &'static str,
    func: Arc<CompareFn>,
}

impl CustomComparison {
    pub fn new<T, F>(func: F) -> Self
    where
        T: ValueType,
        F: Fn(T, T) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        let func = move |lhs: &Value, rhs: &Value| {
            let lhs = narrow::<T>(Side::Lhs, lhs)?;
            let rhs = narrow::<T>(Side::Rhs, rhs)?;
            func(lhs, rhs).map_err(ConditionError::Custom)
        };
        Self {
            type_name: T::TYPE_NAME,
            func: Arc::new(func),
        }
    }

    /// Name of the type both operands must narrow to
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for CustomComparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomComparison")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

fn narrow<T: ValueType>(side: Side, value: &Value) -> Result<T, ConditionError> {
    T::from_value(value).ok_or_else(|| ConditionError::TypeAssertionFailed {
        side,
        expected: T::TYPE_NAME,
        actual: value.resolved().kind(),
    })
}

/// Compares two built values with a [`CustomComparison`]
#[derive(Debug, Clone, Default)]
pub struct CustomCompareCondition {
    pub lhs: Option<ValueBuilder>,
    pub rhs: Option<ValueBuilder>,
    pub comparison: Option<CustomComparison>,
}

impl CustomCompareCondition {
    /// Compare with a function over a single concrete type `T`
    pub fn new<T, F>(lhs: ValueBuilder, rhs: ValueBuilder, func: F) -> Self
    where
        T: ValueType,
        F: Fn(T, T) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self::with_comparison(lhs, rhs, CustomComparison::new(func))
    }

    pub fn with_comparison(
        lhs: ValueBuilder,
        rhs: ValueBuilder,
        comparison: CustomComparison,
    ) -> Self {
        Self {
            lhs: Some(lhs),
            rhs: Some(rhs),
            comparison: Some(comparison),
        }
    }

    /// A condition with no comparison function; evaluating it always fails
    pub fn without_func(lhs: ValueBuilder, rhs: ValueBuilder) -> Self {
        Self {
            lhs: Some(lhs),
            rhs: Some(rhs),
            comparison: None,
        }
    }

    pub fn evaluate(&self, ctx: &PipelineContext) -> Result<bool, ConditionError> {
        if self.lhs.is_none() || self.rhs.is_none() {
            return Err(ConditionError::InvalidCondition(
                "custom comparison needs both builders".to_string(),
            ));
        }
        let comparison = self
            .comparison
            .as_ref()
            .ok_or(ConditionError::NilCustomCompareFunc)?;

        let lhs = build_side(Side::Lhs, &self.lhs, ctx)?;
        let rhs = build_side(Side::Rhs, &self.rhs, ctx)?;
        (comparison.func)(&lhs, &rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::{BuildError, CompareError};
    use crate::engine::value::ValueKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ConditionOperand::*;

    fn literal_bool(b: bool) -> Condition {
        Condition::compare(ValueBuilder::literal(b), Equal, ValueBuilder::literal(true))
    }

    /// Fails whenever evaluated: the context key is never set
    fn failing() -> Condition {
        Condition::compare(
            ValueBuilder::dynamic("never-set"),
            Equal,
            ValueBuilder::literal(1),
        )
    }

    #[test]
    fn test_dynamic_greater_than_literal() {
        let ctx = PipelineContext::with_values([("x", 5)]);
        let cond = Condition::compare(
            ValueBuilder::dynamic("x"),
            GreaterThan,
            ValueBuilder::literal(3),
        );
        assert!(cond.evaluate(&ctx).unwrap());
    }

    #[test]
    fn test_empty_combinators() {
        let ctx = PipelineContext::new();
        assert!(Condition::and([]).evaluate(&ctx).unwrap());
        assert!(!Condition::or([]).evaluate(&ctx).unwrap());
    }

    #[test]
    fn test_and_short_circuits_on_false() {
        let ctx = PipelineContext::new();
        let cond = Condition::and([literal_bool(false), failing()]);
        assert!(!cond.evaluate(&ctx).unwrap());
    }

    #[test]
    fn test_or_short_circuits_on_true() {
        let ctx = PipelineContext::new();
        let cond = Condition::or([literal_bool(true), failing()]);
        assert!(cond.evaluate(&ctx).unwrap());
    }

    #[test]
    fn test_errors_propagate_before_decision() {
        let ctx = PipelineContext::new();
        let and = Condition::and([literal_bool(true), failing(), literal_bool(false)]);
        assert!(matches!(
            and.evaluate(&ctx),
            Err(ConditionError::Build {
                side: Side::Lhs,
                source: BuildError::ValueNotFoundInContext { .. }
            })
        ));

        let or = Condition::or([literal_bool(false), failing()]);
        assert!(or.evaluate(&ctx).is_err());
    }

    #[test]
    fn test_and_or_results() {
        let ctx = PipelineContext::new();
        let both = Condition::and([literal_bool(true), literal_bool(true)]);
        assert!(both.evaluate(&ctx).unwrap());

        let neither = Condition::or([literal_bool(false), literal_bool(false)]);
        assert!(!neither.evaluate(&ctx).unwrap());

        assert!(Condition::not(literal_bool(false)).evaluate(&ctx).unwrap());
    }

    #[test]
    fn test_invalid_value_condition() {
        let ctx = PipelineContext::new();

        let unset = ValueCondition {
            lhs: Some(ValueBuilder::literal(1)),
            rhs: Some(ValueBuilder::literal(1)),
            operand: Invalid,
        };
        assert!(matches!(
            unset.evaluate(&ctx),
            Err(ConditionError::InvalidCondition(_))
        ));

        let missing_rhs = ValueCondition {
            lhs: Some(ValueBuilder::literal(1)),
            rhs: None,
            operand: Equal,
        };
        assert!(matches!(
            missing_rhs.evaluate(&ctx),
            Err(ConditionError::InvalidCondition(_))
        ));
    }

    #[test]
    fn test_comparison_failure_is_attributed() {
        let ctx = PipelineContext::new();
        let cond = Condition::compare(
            ValueBuilder::literal("a"),
            LessThan,
            ValueBuilder::literal(1),
        );
        assert!(matches!(
            cond.evaluate(&ctx),
            Err(ConditionError::ComparisonFailed(CompareError::IncompatibleTypes { .. }))
        ));
    }

    #[test]
    fn test_custom_compare() {
        let ctx = PipelineContext::with_values([("word", "Hello")]);
        let cond = CustomCompareCondition::new(
            ValueBuilder::dynamic("word"),
            ValueBuilder::literal("HELLO"),
            |a: String, b: String| Ok(a.eq_ignore_ascii_case(&b)),
        );
        assert!(cond.evaluate(&ctx).unwrap());
    }

    #[test]
    fn test_custom_compare_type_assertion() {
        let ctx = PipelineContext::new();
        let cond = CustomCompareCondition::new(
            ValueBuilder::literal(1_i32),
            ValueBuilder::literal("x"),
            |a: String, b: String| Ok(a == b),
        );
        match cond.evaluate(&ctx) {
            Err(ConditionError::TypeAssertionFailed {
                side,
                expected,
                actual,
            }) => {
                assert_eq!(side, Side::Lhs);
                assert_eq!(expected, "string");
                assert_eq!(actual, ValueKind::I32);
            }
            other => panic!("Expected TypeAssertionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_compare_error_returned_verbatim() {
        let ctx = PipelineContext::new();
        let cond = CustomCompareCondition::new(
            ValueBuilder::literal(1_i64),
            ValueBuilder::literal(2_i64),
            |_: i64, _: i64| Err("not today".into()),
        );
        let err = cond.evaluate(&ctx).unwrap_err();
        assert!(matches!(err, ConditionError::Custom(_)));
        assert_eq!(err.to_string(), "not today");
    }

    #[test]
    fn test_custom_compare_requires_func_and_builders() {
        let ctx = PipelineContext::new();
        let no_func = CustomCompareCondition::without_func(
            ValueBuilder::literal(1),
            ValueBuilder::literal(1),
        );
        assert!(matches!(
            no_func.evaluate(&ctx),
            Err(ConditionError::NilCustomCompareFunc)
        ));

        let no_lhs = CustomCompareCondition {
            lhs: None,
            ..no_func.clone()
        };
        assert!(matches!(
            no_lhs.evaluate(&ctx),
            Err(ConditionError::InvalidCondition(_))
        ));
    }

    #[test]
    fn test_custom_func_not_called_after_narrowing_failure() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let ctx = PipelineContext::new();
        let cond = CustomCompareCondition::new(
            ValueBuilder::literal(1_u8),
            ValueBuilder::literal(1_u16),
            |_: u8, _: u8| {
                CALLS.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            },
        );
        assert!(cond.evaluate(&ctx).is_err());
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }
}
