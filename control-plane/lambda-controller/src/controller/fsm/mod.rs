pub mod actions;
pub mod conditions;
pub mod evaluator;

pub use actions::FsmAction;
pub use evaluator::{EvalInput, EvalOutput, Phase, Remote, evaluate};

// Unit tests for FSM evaluator live in a sibling module file
#[cfg(test)]
mod evaluator_tests;
