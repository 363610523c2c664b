/// What a component did with a key.
///
/// Parents offer each key to their active component first and fall back to
/// their own bindings on `NotHandled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing for the parent to do
  Handled,
  /// Consumed, and the parent should act on this
  Event(T),
  /// Not consumed
  NotHandled,
}
