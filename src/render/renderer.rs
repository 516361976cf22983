//! External cloud renderer contract and lifecycle tracking.

use crate::atmosphere::state::CloudUniform;
use crate::core::Result;

/// A live cloud renderer instance.
pub trait CloudRenderer {
    /// Apply a full payload, restarting the frame loop if it was suspended.
    fn set_options(&mut self, options: &CloudUniform);
    fn set_speed(&mut self, speed: f32);
    /// Cancel the renderer's internal frame loop without tearing it down.
    fn suspend(&mut self);
    fn destroy(&mut self);
}

/// Builds renderer instances once the dependency is available.
pub trait RendererFactory {
    fn construct(&mut self, options: &CloudUniform) -> Result<Box<dyn CloudRenderer>>;
}

/// Loads the renderer dependency.
#[allow(async_fn_in_trait)]
pub trait RendererLoader {
    async fn load(&self) -> Result<Box<dyn RendererFactory>>;
}

/// Lifecycle of the renderer instance.
pub enum RendererState {
    NotConstructed,
    Active(Box<dyn CloudRenderer>),
    /// Alive but with its frame loop suspended.
    Frozen(Box<dyn CloudRenderer>),
    Destroyed,
}

/// Owns the renderer factory and instance and applies freeze transitions.
pub struct RendererSlot {
    factory: Option<Box<dyn RendererFactory>>,
    state: RendererState,
}

impl Default for RendererSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererSlot {
    pub fn new() -> Self {
        Self {
            factory: None,
            state: RendererState::NotConstructed,
        }
    }

    /// Make a factory available. The instance is built on the next update.
    pub fn attach(&mut self, factory: Box<dyn RendererFactory>) {
        self.factory = Some(factory);
    }

    #[inline]
    pub fn has_factory(&self) -> bool {
        self.factory.is_some()
    }

    #[inline]
    pub fn is_constructed(&self) -> bool {
        matches!(self.state, RendererState::Active(_) | RendererState::Frozen(_))
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        matches!(self.state, RendererState::Frozen(_))
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        matches!(self.state, RendererState::Destroyed)
    }

    #[inline]
    pub fn state(&self) -> &RendererState {
        &self.state
    }

    /// Push a payload, constructing on first use and moving between active
    /// and frozen according to `freeze`.
    pub fn update(&mut self, options: &CloudUniform, freeze: bool) {
        let state = std::mem::replace(&mut self.state, RendererState::Destroyed);
        self.state = match state {
            RendererState::NotConstructed => match self.factory.as_mut() {
                Some(factory) => match factory.construct(options) {
                    Ok(mut renderer) => {
                        log::info!("Cloud renderer constructed");
                        if freeze {
                            renderer.suspend();
                            RendererState::Frozen(renderer)
                        } else {
                            RendererState::Active(renderer)
                        }
                    }
                    Err(e) => {
                        log::warn!("Cloud renderer construction failed: {e}; continuing without clouds");
                        self.factory = None;
                        RendererState::NotConstructed
                    }
                },
                None => RendererState::NotConstructed,
            },
            RendererState::Active(mut renderer) if freeze => {
                log::debug!("Freezing cloud renderer");
                renderer.suspend();
                RendererState::Frozen(renderer)
            }
            RendererState::Active(mut renderer) => {
                renderer.set_options(options);
                RendererState::Active(renderer)
            }
            RendererState::Frozen(renderer) if freeze => RendererState::Frozen(renderer),
            RendererState::Frozen(mut renderer) => {
                log::debug!("Unfreezing cloud renderer");
                renderer.set_options(options);
                RendererState::Active(renderer)
            }
            RendererState::Destroyed => RendererState::Destroyed,
        };
    }

    /// Change speed on an active renderer. Frozen renderers stay still.
    pub fn set_speed(&mut self, speed: f32) {
        if let RendererState::Active(renderer) = &mut self.state {
            renderer.set_speed(speed);
        }
    }

    pub fn destroy(&mut self) {
        match std::mem::replace(&mut self.state, RendererState::Destroyed) {
            RendererState::Active(mut renderer) | RendererState::Frozen(mut renderer) => {
                renderer.destroy();
                log::info!("Cloud renderer destroyed");
            }
            RendererState::NotConstructed | RendererState::Destroyed => {}
        }
        self.factory = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
