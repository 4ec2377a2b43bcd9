
use std::sync::{Arc, Condvar, Mutex};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct State {
	outstanding: u64,
	shutting_down: bool,
}

/// Tracks the number of in-flight backend requests (raw-tx fetches, in this crate) so that
/// read-only index queries can wait until the index has caught up with everything it has
/// already kicked off, rather than returning a balance computed mid-update.
///
/// Increments and decrements may happen from any thread; [`Synchronizer::wait_synchronized`]
/// blocks until it observes the counter at zero.
#[derive(Debug, Clone)]
pub struct Synchronizer {
	inner: Arc<(Mutex<State>, Condvar)>,
}

/// A scoped token for one in-flight request, returned by [`Synchronizer::inc_requests`].
///
/// Dropping the handle (on any exit path, including a panicking one) decrements the counter
/// and wakes any waiter that might now be unblocked.
#[derive(Debug)]
pub struct Handle {
	inner: Arc<(Mutex<State>, Condvar)>,
}

impl Synchronizer {
	pub fn new() -> Synchronizer {
		Synchronizer {
			inner: Arc::new((Mutex::new(State::default()), Condvar::new())),
		}
	}

	/// Marks one backend request as outstanding. The request is considered complete, and the
	/// counter decremented, when the returned [`Handle`] is dropped.
	pub fn inc_requests(&self) -> Handle {
		let (lock, _) = &*self.inner;
		lock.lock().unwrap().outstanding += 1;
		Handle {
			inner: self.inner.clone(),
		}
	}

	/// Blocks until no backend requests are outstanding.
	///
	/// Returns [`Error::Cancelled`] if [`Synchronizer::shutdown`] has been called.
	pub fn wait_synchronized(&self) -> Result<()> {
		let (lock, cvar) = &*self.inner;
		let guard = lock.lock().unwrap();
		let guard = cvar
			.wait_while(guard, |s| s.outstanding > 0 && !s.shutting_down)
			.unwrap();
		if guard.shutting_down {
			return Err(Error::Cancelled);
		}
		Ok(())
	}

	/// Unblocks every waiter with [`Error::Cancelled`], regardless of outstanding requests.
	pub fn shutdown(&self) {
		let (lock, cvar) = &*self.inner;
		lock.lock().unwrap().shutting_down = true;
		cvar.notify_all();
	}
}

impl Default for Synchronizer {
	fn default() -> Synchronizer {
		Synchronizer::new()
	}
}

impl Drop for Handle {
	fn drop(&mut self) {
		let (lock, cvar) = &*self.inner;
		let mut state = lock.lock().unwrap();
		state.outstanding = state.outstanding.saturating_sub(1);
		if state.outstanding == 0 {
			cvar.notify_all();
		}
	}
}
