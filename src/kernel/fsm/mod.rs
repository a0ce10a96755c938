//! Generic finite-state-machine dispatcher.
//!
//! A state is a plain value (usually a fieldless enum). The handler receives
//! the current state and a message and answers with a [`Transition`]. The
//! dispatcher applies the transition once the handler has returned, so a
//! transition only affects the messages that follow.
use crate::kernel::message::Message;

/// Outcome of handling one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition<S> {
    /// Keep the current state.
    Stay,
    /// Switch to another state before the next dispatch.
    To(S),
}

/// Behaviour attached to a state machine.
pub trait StateHandler {
    type State: Copy + PartialEq + core::fmt::Debug;
    type Error;

    /// React to `msg` while in `state`.
    fn handle(
        &mut self,
        state: Self::State,
        msg: &Message,
    ) -> Result<Transition<Self::State>, Self::Error>;
}

/// State machine: the current state plus the handler that interprets it.
///
/// There is no terminal state; a machine keeps dispatching for as long as it
/// receives messages.
#[derive(Debug)]
pub struct Fsm<H: StateHandler> {
    state: H::State,
    handler: H,
}

impl<H: StateHandler> Fsm<H> {
    pub fn new(initial: H::State, handler: H) -> Self {
        Self {
            state: initial,
            handler,
        }
    }

    #[inline]
    pub fn state(&self) -> H::State {
        self.state
    }

    #[inline]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    #[inline]
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Run the current state's handler on `msg`, then apply its transition.
    ///
    /// On error the state is left unchanged.
    pub fn dispatch(&mut self, msg: &Message) -> Result<(), H::Error> {
        if let Transition::To(next) = self.handler.handle(self.state, msg)? {
            self.state = next;
        }
        Ok(())
    }
}
