//! IDisposable ownership analysis.
//!
//! The oracle decides what is disposable, the classifier turns a scope into
//! an ordered trace of events per variable, and the seven rules turn traces
//! and syntactic contexts into diagnostics.

mod class_rule;
mod classifier;
mod collections;
mod constructor_rule;
mod context;
mod factory_registration_rule;
mod field_property_rule;
mod local_variable_rule;
mod members;
mod method_invocation_rule;
mod object_creation_rule;
mod oracle;
mod sink;
#[cfg(test)]
mod test_support;
mod whitelist;

pub use class_rule::ClassRule;
pub use classifier::{classify_node, classify_ordered, EventKind, ExpressionEvent};
pub use collections::{is_disposed_by_helper, DISPOSE_HELPERS, REMOVE_METHODS};
pub use constructor_rule::ConstructorRule;
pub use context::{AnalysisSettings, RuleContext, DEFAULT_FACTORY_ATTRIBUTES};
pub use factory_registration_rule::FactoryRegistrationRule;
pub use field_property_rule::FieldPropertyRule;
pub use local_variable_rule::LocalVariableRule;
pub use method_invocation_rule::MethodInvocationRule;
pub use object_creation_rule::ObjectCreationRule;
pub use oracle::{CollectionType, DisposableOracle};
pub use whitelist::Whitelist;

use crate::lint::{Rule, RuleCode};

/// Rule implementation for a code.
pub fn rule_for(code: RuleCode) -> Box<dyn Rule> {
    match code {
        RuleCode::DSP001 => Box::new(ClassRule::new()),
        RuleCode::DSP002 => Box::new(ConstructorRule::new()),
        RuleCode::DSP003 => Box::new(FieldPropertyRule::new()),
        RuleCode::DSP004 => Box::new(LocalVariableRule::new()),
        RuleCode::DSP005 => Box::new(MethodInvocationRule::new()),
        RuleCode::DSP006 => Box::new(ObjectCreationRule::new()),
        RuleCode::DSP007 => Box::new(FactoryRegistrationRule::new()),
    }
}

/// Every rule, in code order.
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    RuleCode::all().iter().map(|&code| rule_for(code)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_for_matches_code() {
        for rule in all_rules() {
            assert_eq!(rule_for(rule.code()).code(), rule.code());
        }
        assert_eq!(all_rules().len(), RuleCode::all().len());
    }
}
