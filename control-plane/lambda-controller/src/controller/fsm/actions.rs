#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FsmAction {
    AddFinalizer,
    /// Resolve references and read the remote resource.
    Observe,
    Create,
    /// Apply this many planned operations.
    ApplyOps(usize),
    /// Wait for AWS to finish a transition before touching the resource.
    AwaitSettle,
    Delete,
    RemoveFinalizer,
}
