//! Shop catalogue store and admin CRUD.

use crate::effect::Effect;
use crate::environment::PortalEnvironment;
use crate::error::{PortalError, ValidationError};
use crate::notifications::Toast;
use crate::reducer::Reducer;
use crate::types::{AuthToken, Product, ProductId};
use crate::validation::ProductForm;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

/// Product list
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductState {
    /// Products as last confirmed by the server
    pub products: Vec<Product>,
    /// A list fetch is in flight
    pub loading: bool,
    /// Validation failure of the last submitted form
    #[serde(skip)]
    pub form_error: Option<ValidationError>,
    /// Last API failure
    #[serde(skip)]
    pub last_error: Option<PortalError>,
    /// Toast outbox
    #[serde(skip)]
    pub notices: Vec<Toast>,
}

impl ProductState {
    /// Product by id
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    /// Products in one shop category
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Product> + 'a {
        self.products
            .iter()
            .filter(move |product| product.category.eq_ignore_ascii_case(category))
    }
}

/// Product commands and results
#[derive(Clone, Debug, PartialEq)]
pub enum ProductAction {
    /// Fetch the product list
    Load,
    /// Validate and create a product
    Create {
        /// Admin token
        token: AuthToken,
        /// Form contents
        form: ProductForm,
    },
    /// Validate and replace a product
    Update {
        /// Admin token
        token: AuthToken,
        /// Product to change
        id: ProductId,
        /// Form contents
        form: ProductForm,
    },
    /// Delete a product
    Delete {
        /// Admin token
        token: AuthToken,
        /// Product to delete
        id: ProductId,
    },
    /// List fetched
    Loaded {
        /// Every product
        products: Vec<Product>,
    },
    /// Server copy of a created or updated product
    Saved {
        /// The product
        product: Product,
    },
    /// Server confirmed a delete
    Deleted {
        /// Deleted product
        id: ProductId,
    },
    /// A call failed
    Failed {
        /// Why
        error: PortalError,
    },
}

impl ProductAction {
    /// The API failure this action reports, if any
    #[must_use]
    pub const fn failure(&self) -> Option<&PortalError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Reducer for the shop catalogue
#[derive(Clone, Debug, Default)]
pub struct ProductReducer;

impl ProductReducer {
    /// Creates a new `ProductReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for ProductReducer {
    type State = ProductState;
    type Action = ProductAction;
    type Environment = PortalEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let api = Arc::clone(&env.api);
        match action {
            ProductAction::Load => {
                state.loading = true;
                smallvec![Effect::future(async move {
                    Some(match api.list_products().await {
                        Ok(products) => ProductAction::Loaded { products },
                        Err(error) => ProductAction::Failed { error },
                    })
                })]
            },

            ProductAction::Create { token, form } => match form.validate() {
                Ok(draft) => {
                    state.form_error = None;
                    smallvec![Effect::future(async move {
                        Some(match api.create_product(token, draft).await {
                            Ok(product) => ProductAction::Saved { product },
                            Err(error) => ProductAction::Failed { error },
                        })
                    })]
                },
                Err(error) => {
                    state.notices.push(Toast::error(error.to_string()));
                    state.form_error = Some(error);
                    SmallVec::new()
                },
            },

            ProductAction::Update { token, id, form } => match form.validate() {
                Ok(draft) => {
                    state.form_error = None;
                    smallvec![Effect::future(async move {
                        Some(match api.update_product(token, id, draft).await {
                            Ok(product) => ProductAction::Saved { product },
                            Err(error) => ProductAction::Failed { error },
                        })
                    })]
                },
                Err(error) => {
                    state.notices.push(Toast::error(error.to_string()));
                    state.form_error = Some(error);
                    SmallVec::new()
                },
            },

            ProductAction::Delete { token, id } => smallvec![Effect::future(async move {
                Some(match api.delete_product(token, id).await {
                    Ok(()) => ProductAction::Deleted { id },
                    Err(error) => ProductAction::Failed { error },
                })
            })],

            ProductAction::Loaded { products } => {
                state.loading = false;
                state.last_error = None;
                state.products = products;
                SmallVec::new()
            },

            ProductAction::Saved { product } => {
                state.notices.push(Toast::success(format!("{} saved", product.name)));
                match state.products.iter_mut().find(|p| p.id == product.id) {
                    Some(existing) => *existing = product,
                    None => state.products.push(product),
                }
                SmallVec::new()
            },

            ProductAction::Deleted { id } => {
                state.products.retain(|product| product.id != id);
                state.notices.push(Toast::success("Product deleted"));
                SmallVec::new()
            },

            ProductAction::Failed { error } => {
                tracing::warn!(%error, "Product request failed");
                state.loading = false;
                state.notices.push(Toast::error(error.user_message()));
                state.last_error = Some(error);
                SmallVec::new()
            },
        }
    }
}
