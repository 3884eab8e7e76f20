//! Form actions served by this binary.
//!
//! The contact form is the reference action: a validated submission that
//! is stored in memory. It shows each dispatcher outcome: field errors, a
//! business rejection for duplicates, a redirect when `return_to` is set, and
//! a masked failure once the store is full.

use std::sync::{Arc, Mutex, MutexGuard};

use formaction_core::{
    ActionArgs, ActionBuilder, ActionConfig, ActionError, ActionHandler, ActionResponse,
    ActionResult, FormData, FormSchema, NoInput,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A contact form submission.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactForm {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(max = 200, message = "Subject must be at most 200 characters"))]
    pub subject: Option<String>,

    #[validate(length(
        min = 10,
        max = 2000,
        message = "Message must be between 10 and 2000 characters"
    ))]
    pub message: String,

    /// Checkbox; absent when unchecked.
    #[serde(default)]
    pub subscribe: bool,

    /// Site-relative path to navigate to after a successful submission.
    pub return_to: Option<String>,
}

/// Acknowledgement returned for a stored or archived message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: u64,
}

#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub subscribe: bool,
    pub archived: bool,
}

#[derive(Default)]
struct StoreInner {
    next_id: u64,
    messages: Vec<ContactMessage>,
}

/// Outcome of [`ContactStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stored {
    Created(u64),
    Duplicate,
}

/// Bounded in-memory store of contact messages.
pub struct ContactStore {
    capacity: usize,
    inner: Mutex<StoreInner>,
}

impl ContactStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("contact store lock poisoned"))
    }

    /// Store a submission, unless the same sender already sent the same
    /// message. The check and the insert happen under one lock.
    pub fn insert(&self, form: ContactForm) -> anyhow::Result<Stored> {
        let mut inner = self.lock()?;
        let duplicate = inner
            .messages
            .iter()
            .any(|m| m.email.eq_ignore_ascii_case(&form.email) && m.message == form.message);
        if duplicate {
            return Ok(Stored::Duplicate);
        }
        if inner.messages.len() >= self.capacity {
            anyhow::bail!("contact store is full ({} messages)", self.capacity);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.messages.push(ContactMessage {
            id,
            name: form.name,
            email: form.email,
            subject: form.subject,
            message: form.message,
            subscribe: form.subscribe,
            archived: false,
        });
        Ok(Stored::Created(id))
    }

    /// Mark a message archived. Returns `false` when no message has `id`.
    pub fn archive(&self, id: u64) -> anyhow::Result<bool> {
        let mut inner = self.lock()?;
        match inner.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.archived = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn get(&self, id: u64) -> anyhow::Result<Option<ContactMessage>> {
        let inner = self.lock()?;
        Ok(inner.messages.iter().find(|m| m.id == id).cloned())
    }

    pub fn len(&self) -> anyhow::Result<usize> {
        Ok(self.lock()?.messages.len())
    }
}

/// The finished action handlers, shared by every request.
#[derive(Clone)]
pub struct Actions {
    pub contact: ActionHandler<Receipt>,
    pub archive: ActionHandler<Receipt>,
}

impl Actions {
    pub fn new(config: ActionConfig, store: Arc<ContactStore>) -> Self {
        let base = ActionBuilder::create_with(config);

        let contact = {
            let store = Arc::clone(&store);
            base.named("contact")
                .input(FormSchema::<ContactForm>::new())
                .handler(move |args: ActionArgs<ContactForm>| {
                    submit_contact(Arc::clone(&store), args.input)
                })
        };

        let archive = base
            .named("contact.archive")
            .handler(move |args: ActionArgs<NoInput>| {
                archive_contact(Arc::clone(&store), args.form_data)
            });

        Self { contact, archive }
    }
}

async fn submit_contact(
    store: Arc<ContactStore>,
    input: ContactForm,
) -> ActionResult<ActionResponse<Receipt>> {
    let return_to = input.return_to.clone();
    let id = match store.insert(input)? {
        Stored::Created(id) => id,
        Stored::Duplicate => {
            return Err(ActionError::business("This message has already been sent"));
        }
    };
    tracing::info!(id, "Stored contact message");

    match return_to.as_deref().filter(|path| is_local_path(path)) {
        Some(path) => Err(ActionError::redirect(path)),
        None => Ok(ActionResponse::ok(Receipt { id })),
    }
}

async fn archive_contact(
    store: Arc<ContactStore>,
    form: FormData,
) -> ActionResult<ActionResponse<Receipt>> {
    let Some(raw) = form.get_text("id").filter(|s| !s.trim().is_empty()) else {
        return Err(ActionError::business("A message id is required"));
    };
    let id: u64 = raw
        .trim()
        .parse()
        .map_err(|_| ActionError::business("Invalid message id"))?;

    if !store.archive(id)? {
        return Err(ActionError::not_found());
    }
    Ok(ActionResponse::ok(Receipt { id }))
}

/// A path on this site: rooted, and not protocol-relative.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}
