use serde_json::Value;

use crate::error::RuleEvalError;

/// Evaluates a JSON-logic-style predicate tree against `data`.
///
/// `node` must be either a literal (`bool`/`number`/`string`/`null`/array
/// of literals) or a single-key object naming an operator, e.g.
/// `{"and": [{"==": [...]}, {"<": [...]}]}`. Terminates in time linear in
/// the tree's node count for any acyclic tree, since `Value` cannot
/// represent a cycle.
pub fn evaluate(node: &Value, data: &Value) -> Result<Value, RuleEvalError> {
    match node {
        Value::Object(map) if map.len() == 1 => {
            let (op, args) = map.iter().next().expect("checked len() == 1 above");
            apply(op, args, data)
        }
        // A literal: numbers, strings, bools, null, and (non-operator)
        // arrays evaluate to themselves.
        other => Ok(other.clone()),
    }
}

/// Normalizes an operator's operand into a `Vec<&Value>` of arguments.
/// JsonLogic allows a bare (non-array) operand for single-argument
/// operators (`{"var": "x"}` instead of `{"var": ["x"]}`).
fn as_args(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn apply(op: &str, raw_args: &Value, data: &Value) -> Result<Value, RuleEvalError> {
    match op {
        "var" => eval_var(raw_args, data),
        "and" => eval_and(raw_args, data),
        "or" => eval_or(raw_args, data),
        "not" => eval_not(raw_args, data),
        "==" => eval_binary_cmp(raw_args, data, |a, b| numbers_or_strings_eq(a, b)),
        "!=" => eval_binary_cmp(raw_args, data, |a, b| !numbers_or_strings_eq(a, b)),
        "<" => eval_numeric_cmp(raw_args, data, |a, b| a < b),
        "<=" => eval_numeric_cmp(raw_args, data, |a, b| a <= b),
        ">" => eval_numeric_cmp(raw_args, data, |a, b| a > b),
        ">=" => eval_numeric_cmp(raw_args, data, |a, b| a >= b),
        "+" => eval_fold(raw_args, data, 0.0, |acc, v| acc + v),
        "-" => eval_subtract(raw_args, data),
        "*" => eval_fold(raw_args, data, 1.0, |acc, v| acc * v),
        "/" => eval_divide(raw_args, data),
        other => Err(RuleEvalError::Malformed(format!("unknown operator '{other}'"))),
    }
}

/// Looks up a dot-separated path (`"limits.cpu.upper"`) in `data`.
/// `{"var": [path, default]}` supplies a fallback instead of erroring on a
/// missing field; `{"var": ""}` or `{"var": []}` returns `data` itself.
fn eval_var(raw_args: &Value, data: &Value) -> Result<Value, RuleEvalError> {
    let args = as_args(raw_args);
    let path_value = args.first().copied().unwrap_or(&Value::Null);
    let path = match path_value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => return Err(RuleEvalError::Malformed(format!("var path must be a string, got {other}"))),
    };
    let default = args.get(1).copied();

    if path.is_empty() {
        return Ok(data.clone());
    }

    let mut current = data;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => {
                return match default {
                    Some(d) => evaluate(d, data),
                    None => Err(RuleEvalError::MissingField(path)),
                };
            }
        }
    }
    Ok(current.clone())
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

fn eval_and(raw_args: &Value, data: &Value) -> Result<Value, RuleEvalError> {
    let mut last = Value::Bool(true);
    for arg in as_args(raw_args) {
        last = evaluate(arg, data)?;
        if !is_truthy(&last) {
            return Ok(last);
        }
    }
    Ok(last)
}

fn eval_or(raw_args: &Value, data: &Value) -> Result<Value, RuleEvalError> {
    let mut last = Value::Bool(false);
    for arg in as_args(raw_args) {
        last = evaluate(arg, data)?;
        if is_truthy(&last) {
            return Ok(last);
        }
    }
    Ok(last)
}

fn eval_not(raw_args: &Value, data: &Value) -> Result<Value, RuleEvalError> {
    let args = as_args(raw_args);
    let operand = args
        .first()
        .ok_or_else(|| RuleEvalError::Malformed("'not' requires one operand".to_string()))?;
    let evaluated = evaluate(operand, data)?;
    Ok(Value::Bool(!is_truthy(&evaluated)))
}

fn as_number(v: &Value) -> Result<f64, RuleEvalError> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| RuleEvalError::Malformed(format!("number out of range: {n}"))),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| RuleEvalError::Malformed(format!("not a number: '{s}'"))),
        other => Err(RuleEvalError::Malformed(format!("expected a number, got {other}"))),
    }
}

fn numbers_or_strings_eq(a: &Value, b: &Value) -> bool {
    if let (Ok(x), Ok(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    a == b
}

fn eval_binary_cmp(
    raw_args: &Value,
    data: &Value,
    cmp: impl Fn(&Value, &Value) -> bool,
) -> Result<Value, RuleEvalError> {
    let args = as_args(raw_args);
    if args.len() != 2 {
        return Err(RuleEvalError::Malformed(
            "comparison operators take exactly two operands".to_string(),
        ));
    }
    let left = evaluate(args[0], data)?;
    let right = evaluate(args[1], data)?;
    Ok(Value::Bool(cmp(&left, &right)))
}

fn eval_numeric_cmp(
    raw_args: &Value,
    data: &Value,
    cmp: impl Fn(f64, f64) -> bool,
) -> Result<Value, RuleEvalError> {
    let args = as_args(raw_args);
    if args.len() != 2 {
        return Err(RuleEvalError::Malformed(
            "comparison operators take exactly two operands".to_string(),
        ));
    }
    let left = as_number(&evaluate(args[0], data)?)?;
    let right = as_number(&evaluate(args[1], data)?)?;
    Ok(Value::Bool(cmp(left, right)))
}

fn eval_fold(
    raw_args: &Value,
    data: &Value,
    identity: f64,
    combine: impl Fn(f64, f64) -> f64,
) -> Result<Value, RuleEvalError> {
    let mut acc = identity;
    let mut saw_any = false;
    for arg in as_args(raw_args) {
        let value = as_number(&evaluate(arg, data)?)?;
        acc = if saw_any { combine(acc, value) } else { value };
        saw_any = true;
    }
    Ok(serde_json::json!(acc))
}

/// `-` is unary negation with one operand, binary subtraction with two.
fn eval_subtract(raw_args: &Value, data: &Value) -> Result<Value, RuleEvalError> {
    let args = as_args(raw_args);
    match args.as_slice() {
        [single] => {
            let value = as_number(&evaluate(single, data)?)?;
            Ok(serde_json::json!(-value))
        }
        [left, right] => {
            let l = as_number(&evaluate(left, data)?)?;
            let r = as_number(&evaluate(right, data)?)?;
            Ok(serde_json::json!(l - r))
        }
        _ => Err(RuleEvalError::Malformed(
            "'-' takes one or two operands".to_string(),
        )),
    }
}

fn eval_divide(raw_args: &Value, data: &Value) -> Result<Value, RuleEvalError> {
    let args = as_args(raw_args);
    if args.len() != 2 {
        return Err(RuleEvalError::Malformed(
            "'/' takes exactly two operands".to_string(),
        ));
    }
    let l = as_number(&evaluate(args[0], data)?)?;
    let r = as_number(&evaluate(args[1], data)?)?;
    if r == 0.0 {
        return Err(RuleEvalError::Malformed("division by zero".to_string()));
    }
    Ok(serde_json::json!(l / r))
}
