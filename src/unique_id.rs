use std::sync::Mutex;

static COUNTER: Mutex<usize> = Mutex::new(0);

/// Process-global counter. AST nodes use it as their identity key in the
/// resolution side-table; callables use it for equality.
pub fn unique_id() -> usize {
    let mut guard = COUNTER.lock().expect("Id counter poisoned.");
    *guard += 1;
    *guard
}
