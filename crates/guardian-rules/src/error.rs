/// Errors raised while evaluating a predicate tree.
///
/// Both variants are rule-authoring errors: the caller is expected to
/// catch them at the rule boundary, log the offending rule's name, and
/// skip just that rule for the tick (§7, `RuleMalformed`). Callers attach
/// the rule name themselves (`guardian_events::generate`,
/// `guardian_requests::generate_requests` both build a local `SkippedRule`
/// carrying it plus this error's message) rather than converting through
/// `GuardianError`, since a malformed rule must never abort the tick for
/// every other rule the way a `GuardianError` propagated with `?` would.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuleEvalError {
    /// An operator referenced a field (`{"var": "..."}`) that is absent
    /// from the evaluation context.
    #[error("missing field '{0}' in evaluation context")]
    MissingField(String),

    /// An operator node was not a recognized keyword, or its operand
    /// shape didn't match what the operator expects (e.g. `"and"` given a
    /// non-array, or a comparison given the wrong arity).
    #[error("malformed predicate node: {0}")]
    Malformed(String),
}
