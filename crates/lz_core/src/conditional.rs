//! Conditional sub-graphs.
//!
//! Optional features (DNS integration, an ingress gateway) are declared
//! through [`Stack::build_if`] so that their absence is an `Option` the
//! consumer has to match on, not a null check buried in a constructor.

use tracing::debug;

use crate::stack::Stack;

/// Handle to a branch of descriptors declared by a conditional builder.
#[derive(Debug, Clone)]
pub struct SubGraph<H> {
    handle: H,
    resources: Vec<String>,
}

impl<H> SubGraph<H> {
    /// Whatever the builder returned.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn into_handle(self) -> H {
        self.handle
    }

    /// Names of the descriptors the branch declared, in declaration order.
    pub fn resources(&self) -> &[String] {
        &self.resources
    }
}

impl Stack {
    /// Run `builder` exactly once when `predicate` holds.
    ///
    /// When it does not, nothing is declared and `Ok(None)` is returned.
    pub fn build_if<H, E, F>(&mut self, predicate: bool, builder: F) -> Result<Option<SubGraph<H>>, E>
    where
        F: FnOnce(&mut Stack) -> Result<H, E>,
    {
        if !predicate {
            debug!("Conditional branch disabled, nothing declared");
            return Ok(None);
        }

        let mark = self.mark();
        let handle = builder(self)?;
        let resources = self.names_since(mark);
        debug!("Conditional branch declared {} resources", resources.len());
        Ok(Some(SubGraph { handle, resources }))
    }

    /// Run `builder` with the configured value when one is present.
    pub fn build_if_some<V, H, E, F>(
        &mut self,
        value: Option<V>,
        builder: F,
    ) -> Result<Option<SubGraph<H>>, E>
    where
        F: FnOnce(&mut Stack, V) -> Result<H, E>,
    {
        match value {
            Some(value) => self.build_if(true, |stack| builder(stack, value)),
            None => {
                debug!("Conditional branch has no configured value, nothing declared");
                Ok(None)
            }
        }
    }
}
