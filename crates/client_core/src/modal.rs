//! Multi-step modal state machine. One enum variant per named step; closing
//! at any point discards everything, and data entered in an earlier step is
//! carried forward read-only.

use crate::error::ViewError;

/// Where a validated step submission leads: the next step, or the terminal
/// side-effecting call described by `Payload`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowAdvance<S, P> {
    Next(S),
    Finish(P),
}

pub trait FlowState: Clone {
    type Payload;

    fn first() -> Self;

    fn step_name(&self) -> &'static str;

    /// Local, synchronous, field-scoped validation. Blocks the transition
    /// until it passes.
    fn validate(&self) -> Result<(), ViewError>;

    fn advance(&self) -> FlowAdvance<Self, Self::Payload>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<P> {
    Advanced,
    /// The terminal step validated; the caller must now perform the real
    /// call and report back via `complete` or `fail`.
    Finish(P),
}

#[derive(Debug)]
pub struct ModalFlow<S> {
    state: Option<S>,
    submitting: bool,
    last_error: Option<String>,
}

impl<S: FlowState> Default for ModalFlow<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FlowState> ModalFlow<S> {
    pub fn new() -> Self {
        Self {
            state: None,
            submitting: false,
            last_error: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn current(&self) -> Option<&S> {
        self.state.as_ref()
    }

    /// Mutable access to the active step's form fields.
    pub fn current_mut(&mut self) -> Option<&mut S> {
        self.state.as_mut()
    }

    pub fn step_name(&self) -> Option<&'static str> {
        self.state.as_ref().map(FlowState::step_name)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Opening always starts fresh at the first step; nothing survives from
    /// a previous run.
    pub fn open(&mut self) {
        self.state = Some(S::first());
        self.submitting = false;
        self.last_error = None;
    }

    /// Cancel from any step discards all accumulated step state.
    pub fn cancel(&mut self) {
        self.state = None;
        self.submitting = false;
        self.last_error = None;
    }

    /// Lateral transition for branch links ("forgot password?") that are not
    /// plain submits. Only meaningful while the flow is open.
    pub fn replace(&mut self, step: S) {
        if self.state.is_some() {
            self.state = Some(step);
            self.last_error = None;
        }
    }

    /// Validates the current step and either advances to the next one or
    /// yields the terminal payload. The terminal step stays current until
    /// `complete` or `fail` settles the side-effecting call.
    pub fn submit_step(&mut self) -> Result<StepOutcome<S::Payload>, ViewError> {
        let Some(state) = self.state.as_ref() else {
            return Err(ViewError::validation("no modal is open"));
        };
        if self.submitting {
            return Err(ViewError::validation("a submission is already in flight"));
        }
        if let Err(err) = state.validate() {
            self.last_error = Some(err.message.clone());
            return Err(err);
        }
        self.last_error = None;
        match state.advance() {
            FlowAdvance::Next(next) => {
                self.state = Some(next);
                Ok(StepOutcome::Advanced)
            }
            FlowAdvance::Finish(payload) => {
                self.submitting = true;
                Ok(StepOutcome::Finish(payload))
            }
        }
    }

    /// Terminal call succeeded; the flow closes.
    pub fn complete(&mut self) {
        self.state = None;
        self.submitting = false;
        self.last_error = None;
    }

    /// Terminal call failed; stay on the terminal step and surface the
    /// reason.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.submitting = false;
        self.last_error = Some(reason.into());
    }
}

// --- concrete flow: change-password -> forgot-password -> verify-code -> change-password

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForgotPasswordForm {
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyCodeForm {
    pub code: String,
}

/// Read-only context carried out of the forgot-password branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetContext {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordFlow {
    ChangePassword {
        reset: Option<ResetContext>,
        form: ChangePasswordForm,
    },
    ForgotPassword(ForgotPasswordForm),
    VerifyCode { email: String, form: VerifyCodeForm },
}

impl PasswordFlow {
    /// Entry point for the "forgot password?" link on the first step.
    pub fn forgot_password() -> Self {
        Self::ForgotPassword(ForgotPasswordForm::default())
    }
}

/// What the terminal step actually asks the backend to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSubmit {
    Change {
        current_password: String,
        new_password: String,
    },
    Reset {
        email: String,
        code: String,
        new_password: String,
    },
}

const MIN_PASSWORD_LEN: usize = 8;

impl FlowState for PasswordFlow {
    type Payload = PasswordSubmit;

    fn first() -> Self {
        Self::ChangePassword {
            reset: None,
            form: ChangePasswordForm::default(),
        }
    }

    fn step_name(&self) -> &'static str {
        match self {
            Self::ChangePassword { .. } => "change-password",
            Self::ForgotPassword(_) => "forgot-password",
            Self::VerifyCode { .. } => "verify-code",
        }
    }

    fn validate(&self) -> Result<(), ViewError> {
        match self {
            Self::ChangePassword { reset, form } => {
                if reset.is_none() && form.current_password.is_empty() {
                    return Err(ViewError::validation("current password is required"));
                }
                if form.new_password.len() < MIN_PASSWORD_LEN {
                    return Err(ViewError::validation(format!(
                        "new password must be at least {MIN_PASSWORD_LEN} characters"
                    )));
                }
                if form.new_password != form.confirm_password {
                    return Err(ViewError::validation("passwords do not match"));
                }
                Ok(())
            }
            Self::ForgotPassword(form) => {
                if form.email.is_empty() || !form.email.contains('@') {
                    return Err(ViewError::validation("a valid email address is required"));
                }
                Ok(())
            }
            Self::VerifyCode { form, .. } => {
                if form.code.len() != 6 || !form.code.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ViewError::validation(
                        "verification code must be 6 digits",
                    ));
                }
                Ok(())
            }
        }
    }

    fn advance(&self) -> FlowAdvance<Self, Self::Payload> {
        match self {
            Self::ChangePassword { reset, form } => FlowAdvance::Finish(match reset {
                Some(context) => PasswordSubmit::Reset {
                    email: context.email.clone(),
                    code: context.code.clone(),
                    new_password: form.new_password.clone(),
                },
                None => PasswordSubmit::Change {
                    current_password: form.current_password.clone(),
                    new_password: form.new_password.clone(),
                },
            }),
            Self::ForgotPassword(form) => FlowAdvance::Next(Self::VerifyCode {
                email: form.email.clone(),
                form: VerifyCodeForm::default(),
            }),
            Self::VerifyCode { email, form } => FlowAdvance::Next(Self::ChangePassword {
                reset: Some(ResetContext {
                    email: email.clone(),
                    code: form.code.clone(),
                }),
                form: ChangePasswordForm::default(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/modal_tests.rs"]
mod tests;
