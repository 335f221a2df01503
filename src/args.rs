use std::hash::{Hash, Hasher};

use crate::foundation::error::{GloError, GloResult};

/// A literal scalar argument.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Int(i64),
    Ident(String),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Ident(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Arg {
    Value(Value),
    List(Arguments),
}

/// Ordered, possibly nested, possibly named argument list.
///
/// A named list is a constant: it prints as its name but compares and hashes
/// by its flattened values, so `color (RED)` and `color (255, 0, 0)` are the
/// same command structurally.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    name: Option<String>,
    items: Vec<Arg>,
}

impl Arguments {
    pub fn new(items: Vec<Arg>) -> Self {
        Self { name: None, items }
    }

    pub fn named(name: impl Into<String>, items: Vec<Arg>) -> Self {
        Self {
            name: Some(name.into()),
            items,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_ints(values: &[i64]) -> Self {
        Self::new(values.iter().map(|&v| Arg::Value(Value::Int(v))).collect())
    }

    pub fn from_ident(ident: impl Into<String>) -> Self {
        Self::new(vec![Arg::Value(Value::Ident(ident.into()))])
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn items(&self) -> &[Arg] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Recursively expand nested lists into one ordered sequence of scalars.
    pub fn flatten(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.items.len());
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Value>) {
        for item in &self.items {
            match item {
                Arg::Value(v) => out.push(v.clone()),
                Arg::List(l) => l.flatten_into(out),
            }
        }
    }

    /// Replace every nested constant reference by its literal values.
    ///
    /// The list's own name is kept; the flattened form is unchanged.
    pub fn inline_constants(&mut self) {
        if self.items.iter().any(|a| matches!(a, Arg::List(_))) {
            self.items = self.flatten().into_iter().map(Arg::Value).collect();
        }
    }

    /// Prefix the name of this list and of every nested named list.
    pub fn add_namespace(&mut self, prefix: &str) {
        if let Some(name) = &mut self.name {
            name.insert_str(0, prefix);
        }
        for item in &mut self.items {
            if let Arg::List(l) = item {
                l.add_namespace(prefix);
            }
        }
    }

    /// Prefix the identifier at top-level position `idx`.
    pub fn prefix_ident(&mut self, idx: usize, prefix: &str) -> GloResult<()> {
        match self.items.get_mut(idx) {
            Some(Arg::Value(Value::Ident(s))) => {
                s.insert_str(0, prefix);
                Ok(())
            }
            _ => Err(GloError::validation(format!(
                "argument {idx} of ({self}) is not an identifier"
            ))),
        }
    }

    /// Flattened values as integers.
    pub fn ints(&self) -> GloResult<Vec<i64>> {
        self.flatten()
            .into_iter()
            .map(|v| match v {
                Value::Int(i) => Ok(i),
                Value::Ident(s) => Err(GloError::validation(format!(
                    "expected integer argument, got '{s}'"
                ))),
            })
            .collect()
    }

    /// Items joined by `", "`, ignoring this list's own name.
    pub fn body_string(&self) -> String {
        self.items
            .iter()
            .map(|a| match a {
                Arg::Value(v) => v.to_string(),
                Arg::List(l) => l.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => f.write_str(&self.body_string()),
        }
    }
}

impl PartialEq for Arguments {
    fn eq(&self, other: &Self) -> bool {
        self.flatten() == other.flatten()
    }
}

impl Eq for Arguments {}

impl Hash for Arguments {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flatten().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Int(v)).collect()
    }

    #[test]
    fn display_and_flatten() {
        let a1 = Arguments::from_ints(&[1, 2, 3]);
        let a2 = Arguments::named(
            "a2",
            Arguments::from_ints(&[4, 5, 6]).items().to_vec(),
        );
        let a3 = Arguments::new(vec![Arg::List(a2.clone()), Arg::Value(Value::Int(10))]);
        let a4 = Arguments::named(
            "a4",
            vec![Arg::List(a2.clone()), Arg::Value(Value::Int(20))],
        );

        assert_eq!(a1.to_string(), "1, 2, 3");
        assert_eq!(a2.to_string(), "a2");
        assert_eq!(a3.to_string(), "a2, 10");
        assert_eq!(a4.to_string(), "a4");
        assert_eq!(a1.flatten(), ints(&[1, 2, 3]));
        assert_eq!(a2.flatten(), ints(&[4, 5, 6]));
        assert_eq!(a3.flatten(), ints(&[4, 5, 6, 10]));
        assert_eq!(a4.flatten(), ints(&[4, 5, 6, 20]));
        assert_eq!(a4.body_string(), "a2, 20");
    }

    #[test]
    fn constant_and_literal_compare_equal() {
        let c = Arguments::named("RED", Arguments::from_ints(&[255, 0, 0]).items().to_vec());
        let reference = Arguments::new(vec![Arg::List(c)]);
        assert_eq!(reference, Arguments::from_ints(&[255, 0, 0]));
    }

    #[test]
    fn namespace_and_inline_keep_flattened_values() {
        let c = Arguments::named("C1", Arguments::from_ints(&[1, 2, 3]).items().to_vec());
        let mut reference = Arguments::new(vec![Arg::List(c)]);
        let before = reference.flatten();

        reference.add_namespace("G0_");
        assert_eq!(reference.to_string(), "G0_C1");
        assert_eq!(reference.flatten(), before);

        reference.inline_constants();
        assert_eq!(reference.to_string(), "1, 2, 3");
        assert_eq!(reference.flatten(), before);
    }

    #[test]
    fn prefix_ident_rejects_integers() {
        let mut a = Arguments::from_ident("sub1");
        a.prefix_ident(0, "G1_").unwrap();
        assert_eq!(a.to_string(), "G1_sub1");

        let mut b = Arguments::from_ints(&[3]);
        assert!(b.prefix_ident(0, "G1_").is_err());
    }

    #[test]
    fn ints_rejects_identifiers() {
        assert_eq!(Arguments::from_ints(&[7, 8]).ints().unwrap(), vec![7, 8]);
        assert!(Arguments::from_ident("x").ints().is_err());
    }
}
