//! Display-only relabeling of frames that belong to the interpreter.

use crate::host::FrameDecorator;
use crate::unwinder::FrameChain;

/// A resolved frame, possibly relabeled as an interpreter frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decorated<F> {
    Plain(F),
    Interpreter { frame: F, label: String },
}

impl<F> Decorated<F> {
    pub fn inner(&self) -> &F {
        match self {
            Decorated::Plain(frame) | Decorated::Interpreter { frame, .. } => frame,
        }
    }

    pub fn into_inner(self) -> F {
        match self {
            Decorated::Plain(frame) | Decorated::Interpreter { frame, .. } => frame,
        }
    }

    pub fn is_interpreter(&self) -> bool {
        matches!(self, Decorated::Interpreter { .. })
    }
}

impl<F: FrameDecorator> FrameDecorator for Decorated<F> {
    fn level(&self) -> usize {
        self.inner().level()
    }

    fn pc(&self) -> u64 {
        self.inner().pc()
    }

    fn sp(&self) -> u64 {
        self.inner().sp()
    }

    fn function(&self) -> Option<String> {
        match self {
            Decorated::Plain(frame) => frame.function(),
            Decorated::Interpreter { label, .. } => Some(label.clone()),
        }
    }
}

pub struct InterpFrameFilter {
    label: String,
    pub enabled: bool,
}

impl InterpFrameFilter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
        }
    }

    /// Labels `frame` iff its sp is in `chain`. Without a chain (no
    /// interpreter on this stack) the frame passes through untouched.
    pub fn decorate<F: FrameDecorator>(
        &self,
        frame: F,
        chain: Option<&FrameChain>,
    ) -> Decorated<F> {
        match chain {
            Some(chain) if self.enabled && chain.contains(frame.sp()) => Decorated::Interpreter {
                frame,
                label: self.label.clone(),
            },
            _ => Decorated::Plain(frame),
        }
    }

    pub fn filter<'a, I, F>(
        &'a self,
        frames: I,
        chain: Option<&'a FrameChain>,
    ) -> impl Iterator<Item = Decorated<F>> + 'a
    where
        I: IntoIterator<Item = F>,
        I::IntoIter: 'a,
        F: FrameDecorator + 'a,
    {
        frames
            .into_iter()
            .map(move |frame| self.decorate(frame, chain))
    }
}
