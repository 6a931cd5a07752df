use crate::domain::{Product, ProductDraft};
use crate::validation::{self, FormField, ProductInput, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit { id: String },
}

/// State of the add/edit product form.
#[derive(Debug, Clone)]
pub struct ProductForm {
    mode: FormMode,
    open: bool,
    input: ProductInput,
    errors: ValidationErrors,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            mode: FormMode::Add,
            open: false,
            input: ProductInput::default(),
            errors: ValidationErrors::default(),
        }
    }
}

impl ProductForm {
    /// Opens an empty form for a new product.
    pub fn open_add(&mut self) {
        *self = Self {
            open: true,
            ..Self::default()
        };
    }

    /// Opens the form pre-filled with an existing product.
    pub fn open_edit(&mut self, product: &Product) {
        *self = Self {
            mode: FormMode::Edit {
                id: product.id.clone(),
            },
            open: true,
            input: ProductInput::new(
                product.name.clone(),
                product.quantity.to_string(),
                product.unit_price.to_string(),
            ),
            errors: ValidationErrors::default(),
        };
    }

    /// Closes and clears the form.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Add => "Add product",
            FormMode::Edit { .. } => "Edit product",
        }
    }

    pub fn input(&self) -> &ProductInput {
        &self.input
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.input.name = value.into();
    }

    pub fn set_quantity(&mut self, value: impl Into<String>) {
        self.input.quantity = value.into();
    }

    pub fn set_unit_price(&mut self, value: impl Into<String>) {
        self.input.unit_price = value.into();
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn error(&self, field: FormField) -> Option<&str> {
        self.errors.get(field)
    }

    /// Validates the current input. Errors are kept on the form for display.
    pub fn submit(&mut self) -> Option<ProductDraft> {
        match validation::validate(&self.input) {
            Ok(draft) => {
                self.errors = ValidationErrors::default();
                Some(draft)
            }
            Err(errors) => {
                self.errors = errors;
                None
            }
        }
    }
}
