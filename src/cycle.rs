//! Thread-local circular dependency detection.
//!
//! Tracks the chain of tokens currently resolving on this thread so a
//! re-entered token is reported with its full path (`A -> B -> A`). The
//! engine is synchronous, so resolution never leaves the initiating thread
//! and `thread_local!` state is sufficient.
//!
//! - **O(1) detection**: membership check against a `HashSet` of token ids
//! - **Depth limiting**: [`MAX_RESOLUTION_DEPTH`] bounds pathological graphs
//! - **RAII**: [`ResolutionGuard`] restores state on every exit path

use std::cell::RefCell;
use std::collections::HashSet;

use crate::error::{DiError, DiResult};
use crate::token::Token;

/// Maximum resolution depth (prevents pathological cases).
pub const MAX_RESOLUTION_DEPTH: usize = 100;

struct ResolutionState {
	/// Ids of tokens currently being resolved (O(1) circular detection).
	active: HashSet<u64>,
	/// Resolution depth counter.
	depth: usize,
	/// Resolution path, for displaying circular chains.
	path: Vec<(u64, String)>,
}

impl ResolutionState {
	fn new() -> Self {
		Self {
			active: HashSet::new(),
			depth: 0,
			path: Vec::new(),
		}
	}
}

thread_local! {
	static RESOLUTION_STATE: RefCell<ResolutionState> = RefCell::new(ResolutionState::new());
}

fn build_cycle_path(state: &ResolutionState, token: &Token) -> String {
	if let Some(cycle_start) = state.path.iter().position(|(id, _)| *id == token.id()) {
		let cycle: Vec<&str> = state.path[cycle_start..]
			.iter()
			.map(|(_, name)| name.as_str())
			.collect();
		format!("{} -> {}", cycle.join(" -> "), token.name())
	} else {
		format!("Unknown cycle involving {}", token.name())
	}
}

/// Records the start of a token's resolution.
///
/// Fails with [`DiError::CircularDependency`] if the token is already on
/// this thread's resolution path, or [`DiError::MaxDepthExceeded`] past the
/// depth limit. The returned [`ResolutionGuard`] restores the state via the
/// RAII pattern, on success and failure alike.
pub fn begin_resolution(token: &Token) -> DiResult<ResolutionGuard> {
	RESOLUTION_STATE.with(|state| {
		let mut state = state.borrow_mut();

		state.depth += 1;
		if state.depth > MAX_RESOLUTION_DEPTH {
			let depth = state.depth;
			state.depth -= 1;
			return Err(DiError::MaxDepthExceeded(depth));
		}

		if state.active.contains(&token.id()) {
			let path = build_cycle_path(&state, token);
			state.depth -= 1;
			return Err(DiError::CircularDependency { path });
		}

		state.active.insert(token.id());
		state.path.push((token.id(), token.name().to_string()));
		Ok(ResolutionGuard { token_id: token.id() })
	})
}

/// RAII guard: removes the token from the resolution path on drop.
#[derive(Debug)]
pub struct ResolutionGuard {
	token_id: u64,
}

impl Drop for ResolutionGuard {
	fn drop(&mut self) {
		let _ = RESOLUTION_STATE.try_with(|state| {
			let mut state = state.borrow_mut();
			state.active.remove(&self.token_id);
			if let Some(pos) = state.path.iter().rposition(|(id, _)| *id == self.token_id) {
				state.path.remove(pos);
			}
			state.depth = state.depth.saturating_sub(1);
		});
	}
}
