use model::core::value::Record;

pub mod projection;

/// In-place rewrite applied to every record before it is batched.
pub trait Transform: Send + Sync {
    fn apply(&self, record: &mut Record);
}
