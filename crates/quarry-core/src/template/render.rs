//! Template evaluation.

use serde_json::{Map, Value};

use super::error::{Span, TemplateError};
use super::parser::{BinaryOp, Expr, Node};

/// Evaluates a parsed template against a variable map.
pub struct Renderer<'a> {
    vars: &'a Map<String, Value>,
    scopes: Vec<Map<String, Value>>,
}

impl<'a> Renderer<'a> {
    /// Creates a renderer over the given variables.
    #[must_use]
    pub const fn new(vars: &'a Map<String, Value>) -> Self {
        Self {
            vars,
            scopes: Vec::new(),
        }
    }

    /// Renders `nodes` into `out`.
    ///
    /// # Errors
    ///
    /// Returns the first evaluation error.
    pub fn render(&mut self, nodes: &[Node], out: &mut String) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output(expr) => {
                    let Some(value) = self.lookup(expr)? else {
                        return Err(TemplateError::new(
                            format!("'{}' is undefined", describe(expr)),
                            expr.span(),
                        ));
                    };
                    emit(&value, out);
                }
                Node::If {
                    branches,
                    otherwise,
                } => {
                    let mut taken = false;
                    for (condition, body) in branches {
                        if is_truthy(&self.eval(condition)?) {
                            self.render(body, out)?;
                            taken = true;
                            break;
                        }
                    }
                    if let (false, Some(body)) = (taken, otherwise) {
                        self.render(body, out)?;
                    }
                }
                Node::For {
                    var,
                    iterable,
                    body,
                } => {
                    let items = match self.eval(iterable)? {
                        Value::Array(items) => items,
                        other => {
                            return Err(TemplateError::new(
                                format!("cannot iterate over {}", kind(&other)),
                                iterable.span(),
                            ))
                        }
                    };
                    let count = items.len();
                    for (i, item) in items.into_iter().enumerate() {
                        let mut state = Map::new();
                        state.insert("index".into(), Value::from(i + 1));
                        state.insert("first".into(), Value::Bool(i == 0));
                        state.insert("last".into(), Value::Bool(i + 1 == count));

                        let mut scope = Map::new();
                        scope.insert("loop".into(), Value::Object(state));
                        scope.insert(var.clone(), item);
                        self.scopes.push(scope);
                        let result = self.render(body, out);
                        self.scopes.pop();
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    fn variable(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.vars.get(name))
    }

    /// Resolves an expression, returning `None` when it names something
    /// undefined.
    fn lookup(&self, expr: &Expr) -> Result<Option<Value>, TemplateError> {
        match expr {
            Expr::Var(name, _) => Ok(self.variable(name).cloned()),
            Expr::Attr(base, field, _) => Ok(self.lookup(base)?.and_then(|value| match value {
                Value::Object(mut map) => map.remove(field),
                Value::Array(items) => field
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.into_iter().nth(i)),
                _ => None,
            })),
            Expr::Index(base, index, _) => {
                let index = self.eval(index)?;
                Ok(self.lookup(base)?.and_then(|value| match (value, &index) {
                    (Value::Array(items), Value::Number(n)) => n
                        .as_u64()
                        .and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| items.into_iter().nth(i)),
                    (Value::Object(mut map), Value::String(key)) => map.remove(key),
                    _ => None,
                }))
            }
            _ => self.eval(expr).map(Some),
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Value, TemplateError> {
        match expr {
            Expr::Literal(value, _) => Ok(value.clone()),
            Expr::List(items, _) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Var(..) | Expr::Attr(..) | Expr::Index(..) => {
                Ok(self.lookup(expr)?.unwrap_or(Value::Null))
            }
            Expr::Not(operand, _) => Ok(Value::Bool(!is_truthy(&self.eval(operand)?))),
            Expr::Defined { expr, negated, .. } => {
                Ok(Value::Bool(self.lookup(expr)?.is_some() != *negated))
            }
            Expr::Binary(op, lhs, rhs, span) => self.eval_binary(*op, lhs, rhs, *span),
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        span: Span,
    ) -> Result<Value, TemplateError> {
        let left = self.eval(lhs)?;
        match op {
            BinaryOp::And if !is_truthy(&left) => return Ok(Value::Bool(false)),
            BinaryOp::Or if is_truthy(&left) => return Ok(Value::Bool(true)),
            _ => {}
        }
        let right = self.eval(rhs)?;

        let result = match op {
            BinaryOp::And | BinaryOp::Or => is_truthy(&right),
            BinaryOp::Eq => values_equal(&left, &right),
            BinaryOp::NotEq => !values_equal(&left, &right),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let ordering = compare(&left, &right).ok_or_else(|| {
                    TemplateError::new(
                        format!("cannot compare {} with {}", kind(&left), kind(&right)),
                        span,
                    )
                })?;
                match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::LtEq => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                }
            }
            BinaryOp::In | BinaryOp::NotIn => {
                let found = contains(&right, &left).ok_or_else(|| {
                    TemplateError::new(
                        format!("cannot test membership in {}", kind(&right)),
                        span,
                    )
                })?;
                found == (op == BinaryOp::In)
            }
        };
        Ok(Value::Bool(result))
    }
}

/// Returns whether a value counts as true in a condition.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn emit(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn contains(haystack: &Value, needle: &Value) -> Option<bool> {
    match (haystack, needle) {
        (Value::Array(items), _) => Some(items.iter().any(|item| values_equal(item, needle))),
        (Value::String(s), Value::String(part)) => Some(s.contains(part.as_str())),
        (Value::Object(map), Value::String(key)) => Some(map.contains_key(key)),
        _ => None,
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Var(name, _) => name.clone(),
        Expr::Attr(base, field, _) => format!("{}.{field}", describe(base)),
        Expr::Index(base, _, _) => format!("{}[...]", describe(base)),
        _ => String::from("expression"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::template::parser::parse;

    fn render(source: &str, vars: &Value) -> Result<String, TemplateError> {
        let nodes = parse(source)?;
        let vars = vars.as_object().cloned().unwrap_or_default();
        let mut out = String::new();
        Renderer::new(&vars).render(&nodes, &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_output_rules() {
        let out = render(
            "{{ s }}|{{ n }}|{{ b }}|{{ z }}|{{ l }}",
            &json!({"s": "x", "n": 3, "b": true, "z": null, "l": [1, "a"]}),
        )
        .unwrap();
        assert_eq!(out, r#"x|3|true||[1,"a"]"#);
    }

    #[test]
    fn test_undefined_output_is_error() {
        let err = render("SELECT {{ missing }}", &json!({})).unwrap_err();
        assert_eq!(err.message, "'missing' is undefined");
        assert_eq!(err.span, Span::new(10, 17));
    }

    #[test]
    fn test_undefined_is_falsy() {
        assert_eq!(render("{% if missing %}a{% else %}b{% endif %}", &json!({})).unwrap(), "b");
    }

    #[test]
    fn test_elif() {
        let source = "{% if d == 'pgsql' %}p{% elif d == 'sqlite' %}s{% else %}o{% endif %}";
        assert_eq!(render(source, &json!({"d": "sqlite"})).unwrap(), "s");
        assert_eq!(render(source, &json!({"d": "mysql"})).unwrap(), "o");
    }

    #[test]
    fn test_for_loop_state() {
        let out = render(
            "{% for id in ids %}{{ id }}{% if not loop.last %}, {% endif %}{% endfor %}",
            &json!({"ids": [1, 2, 3]}),
        )
        .unwrap();
        assert_eq!(out, "1, 2, 3");
    }

    #[test]
    fn test_loop_index() {
        let out = render("{% for x in ['a', 'b'] %}{{ loop.index }}{{ x }}{% endfor %}", &json!({}))
            .unwrap();
        assert_eq!(out, "1a2b");
    }

    #[test]
    fn test_loop_variable_does_not_leak() {
        let err = render("{% for x in [1] %}{% endfor %}{{ x }}", &json!({})).unwrap_err();
        assert!(err.message.contains("'x' is undefined"));
    }

    #[test]
    fn test_iterate_non_list() {
        let err = render("{% for x in n %}{% endfor %}", &json!({"n": 3})).unwrap_err();
        assert_eq!(err.message, "cannot iterate over number");
    }

    #[test]
    fn test_membership() {
        let vars = json!({"d": "pgsql", "m": {"k": 1}});
        assert_eq!(render("{{ d in ['pgsql', 'mysql'] }}", &vars).unwrap(), "true");
        assert_eq!(render("{{ d not in ['pgsql'] }}", &vars).unwrap(), "false");
        assert_eq!(render("{{ 'k' in m }}", &vars).unwrap(), "true");
        assert_eq!(render("{{ 'sq' in d }}", &vars).unwrap(), "true");
    }

    #[test]
    fn test_comparisons() {
        let vars = json!({"n": 2});
        assert_eq!(render("{{ n > 1 and n <= 2.0 }}", &vars).unwrap(), "true");
        assert_eq!(render("{{ n == 2.0 }}", &vars).unwrap(), "true");
        assert!(render("{{ n < 'a' }}", &vars).is_err());
    }

    #[test]
    fn test_defined() {
        let vars = json!({"a": {"b": 1}});
        assert_eq!(render("{{ a.b is defined }}", &vars).unwrap(), "true");
        assert_eq!(render("{{ a.c is not defined }}", &vars).unwrap(), "true");
    }

    #[test]
    fn test_index_access() {
        let vars = json!({"rows": [{"id": 7}], "key": "id"});
        assert_eq!(render("{{ rows[0][key] }}", &vars).unwrap(), "7");
        assert_eq!(render("{{ rows.0.id }}", &vars).unwrap(), "7");
    }
}
