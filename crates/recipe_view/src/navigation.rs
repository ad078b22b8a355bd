//! Router seam for the dismiss action plus two concrete routers.

use crossbeam_channel::{Sender, TrySendError};
use shared::domain::RecipeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    Pop,
}

pub trait Router {
    fn pop(&mut self);
}

/// Forwards pops to whoever owns the navigation stack.
impl Router for Sender<NavigationEvent> {
    fn pop(&mut self) {
        match self.try_send(NavigationEvent::Pop) {
            Ok(()) => tracing::debug!("queued navigation pop"),
            Err(TrySendError::Full(_)) => tracing::warn!("navigation queue is full; pop dropped"),
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("navigation receiver disconnected; pop dropped")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    RecipeDetails(RecipeId),
}

/// Stack of pushed routes. Popping an empty stack does nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationPath {
    routes: Vec<Route>,
}

impl NavigationPath {
    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn top(&self) -> Option<Route> {
        self.routes.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.routes.len()
    }
}

impl Router for NavigationPath {
    fn pop(&mut self) {
        if self.routes.pop().is_none() {
            tracing::debug!("navigation pop on empty path ignored");
        }
    }
}
