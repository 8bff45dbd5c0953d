//! Form host for `simpleform-rules`
//!
//! Loads a model schema, registers controls with their rules, commits values
//! and reports validity the way a rendering layer needs it: a `validates`
//! attribute listing the constraint names and one state class per
//! constraint.
//!
//! ```
//! use serde_json::json;
//! use simpleform_forms::{FieldBinding, Form, ModelSchema};
//!
//! let model = ModelSchema::from_yaml_str(
//!     "model: user\nvalidates:\n  email: { presence: true, format: { email: true } }\n",
//! )?;
//! let mut form = Form::new(model);
//! form.add_field(FieldBinding::model("user.email"))?;
//!
//! assert_eq!(form.name(), "userForm");
//! assert_eq!(form.validates_attribute("user.email").as_deref(), Some("presence,format"));
//!
//! form.set_value("user.email", json!("porky"))?;
//! assert_eq!(form.state_classes("user.email"), vec!["ng-valid-presence", "ng-invalid-format"]);
//! # Ok::<(), simpleform_forms::FormError>(())
//! ```

pub mod config;
pub mod error;
pub mod form;
pub mod model;

pub use config::FormConfig;
pub use error::{FormError, Result};
pub use form::{FieldBinding, Form, RESERVED_NAME};
pub use model::ModelSchema;
