#![forbid(unsafe_code)]

//! The evaluation context stack.
//!
//! Every read is attributed to the frame on top of the stack. Frames are
//! pushed through [`ContextStack::push`], which hands back a guard that pops
//! on drop, so an evaluation that fails or panics still leaves the stack
//! balanced.

use std::cell::RefCell;

use crate::expression::ExprId;

/// One entry on the context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Reads register interest on behalf of this expression.
    Tracking(ExprId),
    /// Reads are not recorded. Used by polling expressions and
    /// [`Reactor::untracked`](crate::Reactor::untracked).
    Untracked,
}

#[derive(Debug, Default)]
pub struct ContextStack {
    frames: RefCell<Vec<Frame>>,
}

impl ContextStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `frame`; it is popped when the returned guard drops.
    #[must_use = "the frame is popped as soon as the guard is dropped"]
    pub fn push(&self, frame: Frame) -> FrameGuard<'_> {
        self.frames.borrow_mut().push(frame);
        FrameGuard { stack: self, frame }
    }

    /// The expression reads should currently be attributed to, if any.
    pub fn current(&self) -> Option<ExprId> {
        match self.frames.borrow().last() {
            Some(Frame::Tracking(id)) => Some(*id),
            Some(Frame::Untracked) | None => None,
        }
    }

    pub fn top(&self) -> Option<Frame> {
        self.frames.borrow().last().copied()
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }

    fn pop(&self) -> Option<Frame> {
        self.frames.borrow_mut().pop()
    }
}

/// Pops its frame on drop.
#[derive(Debug)]
pub struct FrameGuard<'a> {
    stack: &'a ContextStack,
    frame: Frame,
}

impl FrameGuard<'_> {
    pub fn frame(&self) -> Frame {
        self.frame
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        let popped = self.stack.pop();
        debug_assert_eq!(popped, Some(self.frame), "context stack popped out of order");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_frames_restore_previous_top() {
        let stack = ContextStack::new();
        assert_eq!(stack.current(), None);
        {
            let _outer = stack.push(Frame::Tracking(ExprId::from_raw(1)));
            assert_eq!(stack.current(), Some(ExprId::from_raw(1)));
            {
                let _inner = stack.push(Frame::Tracking(ExprId::from_raw(2)));
                assert_eq!(stack.current(), Some(ExprId::from_raw(2)));
                assert_eq!(stack.depth(), 2);
            }
            assert_eq!(stack.current(), Some(ExprId::from_raw(1)));
        }
        assert!(stack.is_empty());
    }

    #[test]
    fn untracked_frame_masks_outer_expression() {
        let stack = ContextStack::new();
        let _outer = stack.push(Frame::Tracking(ExprId::from_raw(7)));
        let guard = stack.push(Frame::Untracked);
        assert_eq!(guard.frame(), Frame::Untracked);
        assert_eq!(stack.current(), None);
        assert_eq!(stack.top(), Some(Frame::Untracked));
        drop(guard);
        assert_eq!(stack.current(), Some(ExprId::from_raw(7)));
    }

    #[test]
    fn guard_pops_during_unwind() {
        let stack = ContextStack::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _frame = stack.push(Frame::Tracking(ExprId::from_raw(3)));
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(stack.depth(), 0);
    }
}
