use super::actions::FsmAction;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Nothing observed yet in this pass.
    Observing,
    Creating,
    Updating,
    /// AWS reports a transitional state; no writes until it settles.
    Settling,
    Synced,
    Terminal,
    Deleting,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Observing => "Observing",
            Phase::Creating => "Creating",
            Phase::Updating => "Updating",
            Phase::Settling => "Settling",
            Phase::Synced => "Synced",
            Phase::Terminal => "Terminal",
            Phase::Deleting => "Deleting",
        }
    }
}

/// What the last read of the AWS resource showed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Remote {
    pub exists: bool,
    pub settling: bool,
    pub pending_ops: usize,
}

pub struct EvalInput {
    pub is_deleting: bool,
    pub has_finalizer: bool,
    /// `ACK.Terminal` is currently `True`.
    pub terminal: bool,
    /// `metadata.generation` differs from `status.observedGeneration`.
    pub generation_changed: bool,
    /// `None` before the remote resource has been read.
    pub remote: Option<Remote>,
}

#[derive(Debug)]
pub struct EvalOutput {
    pub phase: Phase,
    pub actions: Vec<FsmAction>,
}

pub fn evaluate(input: EvalInput) -> EvalOutput {
    if input.is_deleting {
        let actions = if input.has_finalizer {
            vec![FsmAction::Delete, FsmAction::RemoveFinalizer]
        } else {
            vec![]
        };
        return EvalOutput {
            phase: Phase::Deleting,
            actions,
        };
    }

    // Terminal sticks until the user changes the spec.
    if input.terminal && !input.generation_changed {
        return EvalOutput {
            phase: Phase::Terminal,
            actions: vec![],
        };
    }

    let Some(remote) = input.remote else {
        let mut actions = Vec::new();
        if !input.has_finalizer {
            actions.push(FsmAction::AddFinalizer);
        }
        actions.push(FsmAction::Observe);
        return EvalOutput {
            phase: Phase::Observing,
            actions,
        };
    };

    if !remote.exists {
        return EvalOutput {
            phase: Phase::Creating,
            actions: vec![FsmAction::Create],
        };
    }
    if remote.settling {
        return EvalOutput {
            phase: Phase::Settling,
            actions: vec![FsmAction::AwaitSettle],
        };
    }
    if remote.pending_ops > 0 {
        return EvalOutput {
            phase: Phase::Updating,
            actions: vec![FsmAction::ApplyOps(remote.pending_ops)],
        };
    }
    EvalOutput {
        phase: Phase::Synced,
        actions: vec![],
    }
}
