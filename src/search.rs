//! # Predicate search
//!
//! Compiles a reverse-Polish sequence of comparators and boolean
//! operators into a small expression tree, then evaluates it against
//! every object in a clipped [crate::ObjectSet].
//!
//! Compilation keeps two pending lists: freshly pushed, not-yet-attached
//! comparators, and operator-subtrees already built but not yet consumed
//! by a further operator. An operator token consumes *all* pending
//! comparators if any are pending (becoming a "comparator-parent"), or
//! otherwise all pending operator-subtrees ("operator-parent"). The
//! expression is well-formed iff, after the final token, no comparators
//! are left unattached and exactly one root remains.

use crate::error::{Error, Result};
use crate::schema::{CType, Schema};
use crate::CatalogObject;

//tp Comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

//tp BoolOp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone)]
enum CompiledValue {
    Int(i64),
    Short(i16),
    Float(f32),
    Double(f64),
    Str(String),
    StrPrefix(String),
}

//tp Comparator
#[derive(Debug, Clone)]
struct Comparator {
    offset: usize,
    op: Comparison,
    value: CompiledValue,
}

impl Comparator {
    fn eval(&self, obj: &CatalogObject) -> bool {
        let Some(field) = obj.extra_field(self.offset) else {
            return false;
        };
        use crate::schema::FieldValue as FV;
        match (&self.value, field) {
            (CompiledValue::Int(v), FV::Int(x)) => cmp(self.op, *x, *v),
            (CompiledValue::Short(v), FV::Short(x)) => cmp(self.op, *x, *v),
            (CompiledValue::Float(v), FV::Float(x)) => cmp_f(self.op, *x as f64, *v as f64),
            (CompiledValue::Double(v), FV::Double(x)) => cmp_f(self.op, *x, *v),
            (CompiledValue::Str(v), FV::Str(x)) => cmp_str(self.op, x, v),
            (CompiledValue::StrPrefix(prefix), FV::Str(x)) => {
                let starts = x.starts_with(prefix.as_str());
                match self.op {
                    Comparison::Eq => starts,
                    Comparison::Ne => !starts,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

fn cmp<T: PartialOrd>(op: Comparison, a: T, b: T) -> bool {
    match op {
        Comparison::Lt => a < b,
        Comparison::Le => a <= b,
        Comparison::Gt => a > b,
        Comparison::Ge => a >= b,
        Comparison::Eq => a == b,
        Comparison::Ne => a != b,
    }
}
fn cmp_f(op: Comparison, a: f64, b: f64) -> bool {
    cmp(op, a, b)
}
fn cmp_str(op: Comparison, a: &str, b: &str) -> bool {
    match op {
        Comparison::Lt => a < b,
        Comparison::Le => a <= b,
        Comparison::Gt => a > b,
        Comparison::Ge => a >= b,
        Comparison::Eq => a == b,
        Comparison::Ne => a != b,
    }
}

#[derive(Debug, Clone)]
enum Node {
    Comparator(Comparator),
    Bool(BoolOp, Vec<Node>),
}

impl Node {
    fn eval(&self, obj: &CatalogObject) -> bool {
        match self {
            Node::Comparator(c) => c.eval(obj),
            Node::Bool(BoolOp::And, kids) => kids.iter().all(|k| k.eval(obj)),
            Node::Bool(BoolOp::Or, kids) => kids.iter().any(|k| k.eval(obj)),
        }
    }
}

//tp Expression
/// A compiled, ready-to-evaluate search predicate
#[derive(Debug, Clone)]
pub struct Expression {
    root: Node,
}

impl Expression {
    pub fn matches(&self, obj: &CatalogObject) -> bool {
        self.root.eval(obj)
    }
}

//tp ExpressionBuilder
/// Incrementally compiles a reverse-Polish expression, one token at a time
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    pending_comparators: Vec<Node>,
    pending_roots: Vec<Node>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    //mp push_comparator
    /// Compile and push a `field op value` comparator token
    pub fn push_comparator(
        &mut self,
        schema: &Schema,
        field: &str,
        op: Comparison,
        value: &str,
    ) -> Result<()> {
        let f = schema
            .field(field)
            .ok_or_else(|| Error::UnknownField(field.to_string()))?;
        if !f.ctype.supports_comparator() {
            return Err(Error::UnsupportedCtype {
                field: field.to_string(),
                ctype: f.ctype.name(),
            });
        }
        let bad = || Error::BadFieldValue {
            field: field.to_string(),
            ctype: f.ctype.name(),
            value: value.to_string(),
        };
        let compiled = match f.ctype {
            CType::Int => CompiledValue::Int(value.parse::<i64>().map_err(|_| bad())?),
            CType::Short => CompiledValue::Short(value.parse::<i16>().map_err(|_| bad())?),
            CType::Float => CompiledValue::Float(value.parse::<f32>().map_err(|_| bad())?),
            CType::Double => CompiledValue::Double(value.parse::<f64>().map_err(|_| bad())?),
            CType::DoubleAsDegrees => {
                let degrees: f64 = value.parse().map_err(|_| bad())?;
                CompiledValue::Double(degrees * std::f64::consts::PI / 180.0)
            }
            CType::Str => {
                if let Some(prefix) = value.strip_suffix('*') {
                    if !matches!(op, Comparison::Eq | Comparison::Ne) {
                        return Err(bad());
                    }
                    CompiledValue::StrPrefix(prefix.to_string())
                } else {
                    CompiledValue::Str(value.to_string())
                }
            }
            CType::AnglePiece | CType::McpDate => unreachable!("rejected above"),
        };
        self.pending_comparators.push(Node::Comparator(Comparator {
            offset: f.offset,
            op,
            value: compiled,
        }));
        Ok(())
    }

    //mp push_operator
    pub fn push_operator(&mut self, op: BoolOp) {
        let children = if !self.pending_comparators.is_empty() {
            std::mem::take(&mut self.pending_comparators)
        } else {
            std::mem::take(&mut self.pending_roots)
        };
        self.pending_roots.push(Node::Bool(op, children));
    }

    //mp finish
    pub fn finish(mut self) -> Result<Expression> {
        if !self.pending_comparators.is_empty() || self.pending_roots.len() != 1 {
            return Err(Error::UnbalancedExpression);
        }
        Ok(Expression {
            root: self.pending_roots.remove(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldValue;

    fn schema() -> Schema {
        let mut s = Schema::new();
        s.add_field("Vmag", "V", CType::Float, "mag");
        s.add_field("DEdeg", "DE", CType::DoubleAsDegrees, "deg");
        s.add_field("Name", "N", CType::Str, "");
        s
    }

    fn obj(vmag: f32, name: &str) -> CatalogObject {
        CatalogObject::new(1, 0.0, 0.0, vmag as f64)
            .unwrap()
            .with_extra(vec![
                FieldValue::Float(vmag),
                FieldValue::Double(0.1),
                FieldValue::Str(name.to_string()),
            ])
    }

    #[test]
    fn single_comparator() {
        let s = schema();
        let mut b = ExpressionBuilder::new();
        b.push_comparator(&s, "Vmag", Comparison::Lt, "5.0").unwrap();
        let e = b.finish().unwrap();
        assert!(e.matches(&obj(4.0, "a")));
        assert!(!e.matches(&obj(6.0, "a")));
    }

    #[test]
    fn comparator_parent_and() {
        let s = schema();
        let mut b = ExpressionBuilder::new();
        b.push_comparator(&s, "Vmag", Comparison::Lt, "5.0").unwrap();
        b.push_comparator(&s, "Name", Comparison::Eq, "star").unwrap();
        b.push_operator(BoolOp::And);
        let e = b.finish().unwrap();
        assert!(e.matches(&obj(4.0, "star")));
        assert!(!e.matches(&obj(4.0, "other")));
    }

    #[test]
    fn operator_parent_or_of_ands() {
        let s = schema();
        let mut b = ExpressionBuilder::new();
        b.push_comparator(&s, "Vmag", Comparison::Lt, "2.0").unwrap();
        b.push_comparator(&s, "Name", Comparison::Eq, "bright").unwrap();
        b.push_operator(BoolOp::And);
        b.push_comparator(&s, "Vmag", Comparison::Gt, "9.0").unwrap();
        b.push_comparator(&s, "Name", Comparison::Eq, "faint").unwrap();
        b.push_operator(BoolOp::And);
        b.push_operator(BoolOp::Or);
        let e = b.finish().unwrap();
        assert!(e.matches(&obj(1.0, "bright")));
        assert!(e.matches(&obj(10.0, "faint")));
        assert!(!e.matches(&obj(5.0, "bright")));
    }

    #[test]
    fn unbalanced_expression_rejected() {
        let s = schema();
        let mut b = ExpressionBuilder::new();
        b.push_comparator(&s, "Vmag", Comparison::Lt, "5.0").unwrap();
        b.push_comparator(&s, "Name", Comparison::Eq, "x").unwrap();
        assert!(matches!(b.finish(), Err(Error::UnbalancedExpression)));
    }

    #[test]
    fn unsupported_ctype_rejected() {
        let mut s = schema();
        s.add_field("Epoch", "E", CType::McpDate, "");
        let mut b = ExpressionBuilder::new();
        assert!(matches!(
            b.push_comparator(&s, "Epoch", Comparison::Eq, "x"),
            Err(Error::UnsupportedCtype { .. })
        ));
    }

    #[test]
    fn wildcard_prefix_matches() {
        let s = schema();
        let mut b = ExpressionBuilder::new();
        b.push_comparator(&s, "Name", Comparison::Eq, "HD*").unwrap();
        let e = b.finish().unwrap();
        assert!(e.matches(&obj(1.0, "HD12345")));
        assert!(!e.matches(&obj(1.0, "HIP99")));
    }
}
