//! Exception-protected regions.

use crate::model::TypeName;

/// The handler attached to a protected region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Catches exceptions assignable to the given type
    Catch(TypeName),
    /// Catches every exception
    CatchAll,
    /// Catches exceptions accepted by the filter block starting at `filter_start`
    Filter {
        /// Offset of the first instruction of the filter block
        filter_start: u32,
    },
    /// Runs when the try block is left by an exception
    Fault,
    /// Runs whenever the try block is left
    Finally,
}

/// A try block with its handler. Ranges are half-open: `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProtectedRegion {
    /// First offset of the try block
    pub try_start: u32,
    /// Offset just past the try block
    pub try_end: u32,
    /// First offset of the handler block
    pub handler_start: u32,
    /// Offset just past the handler block
    pub handler_end: u32,
    /// The handler flavour
    pub handler: HandlerKind,
}

impl ProtectedRegion {
    /// Creates a region.
    #[must_use]
    pub fn new(
        try_start: u32,
        try_end: u32,
        handler_start: u32,
        handler_end: u32,
        handler: HandlerKind,
    ) -> Self {
        ProtectedRegion {
            try_start,
            try_end,
            handler_start,
            handler_end,
            handler,
        }
    }

    /// Returns `true` if `offset` lies inside the try block.
    #[must_use]
    pub fn try_contains(&self, offset: u32) -> bool {
        (self.try_start..self.try_end).contains(&offset)
    }

    /// Returns `true` if `offset` lies inside the handler block.
    #[must_use]
    pub fn handler_contains(&self, offset: u32) -> bool {
        (self.handler_start..self.handler_end).contains(&offset)
    }

    /// Returns the offsets where control enters on an exception: the handler, and the
    /// filter block for filtered handlers.
    #[must_use]
    pub fn entry_offsets(&self) -> Vec<u32> {
        match self.handler {
            HandlerKind::Filter { filter_start } => vec![filter_start, self.handler_start],
            _ => vec![self.handler_start],
        }
    }

    /// Returns every boundary offset of the region, in declaration order.
    #[must_use]
    pub fn boundaries(&self) -> Vec<u32> {
        let mut bounds = vec![self.try_start, self.try_end];
        if let HandlerKind::Filter { filter_start } = self.handler {
            bounds.push(filter_start);
        }
        bounds.push(self.handler_start);
        bounds.push(self.handler_end);
        bounds
    }

    /// Returns the caught type, if the handler catches a specific type.
    #[must_use]
    pub fn exception_type(&self) -> Option<&TypeName> {
        match &self.handler {
            HandlerKind::Catch(ty) => Some(ty),
            _ => None,
        }
    }

    /// Returns `true` for `finally` and `fault` handlers.
    #[must_use]
    pub fn is_finally_like(&self) -> bool {
        matches!(self.handler, HandlerKind::Finally | HandlerKind::Fault)
    }
}
