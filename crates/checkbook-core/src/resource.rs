// ── Resource actions ──
//
// REST actions over one URL template, composed with an optional Store.
// Reads consult the store first and file what they fetch; writes file
// the server-confirmed record; deletes remove it.

use std::sync::Arc;

use checkbook_api::{ApiClient, Method, Params, UrlTemplate, strip_last_segment};
use serde_json::Value;
use tracing::debug;

use crate::error::{CoreError, StoreError};
use crate::store::{Collection, Element, Item, Store};

/// REST actions for one resource type.
#[derive(Clone)]
pub struct Resource {
    client: Arc<ApiClient>,
    url: UrlTemplate,
    defaults: Params,
    store: Option<Store>,
    read_only: bool,
    /// Collection attributes copied onto members that lack them.
    inherited: Vec<String>,
}

impl Resource {
    pub fn new(client: Arc<ApiClient>, url: UrlTemplate, defaults: Params) -> Self {
        Self {
            client,
            url,
            defaults,
            store: None,
            read_only: false,
            inherited: Vec::new(),
        }
    }

    /// Keep fetched and written records in `store`.
    pub fn with_store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    /// Keep records in a store keyed by this resource's own URL template.
    pub fn stored(self) -> Result<Self, StoreError> {
        let store = Self::default_store(&self.url, &self.defaults)?;
        Ok(self.with_store(store))
    }

    /// Reject write actions.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Copy these collection attributes onto fetched members lacking them,
    /// so members can be keyed by the list they came from.
    pub fn inherit<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherited.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn store(&self) -> Option<&Store> {
        self.store.as_ref()
    }

    pub fn url(&self) -> &UrlTemplate {
        &self.url
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Store keyed by `url` expanded against each item.
    ///
    /// Elements are expanded against their fields, collections against
    /// their attributes. An element belongs to the collection whose key is
    /// its own key minus the last segment.
    pub fn default_store(url: &UrlTemplate, defaults: &Params) -> Result<Store, StoreError> {
        let (key_url, key_defaults) = (url.clone(), defaults.clone());
        let (assoc_url, assoc_defaults) = (url.clone(), defaults.clone());

        Store::builder()
            .key_fn(move |item| match item {
                Item::Element(e) => key_url.expand(&key_defaults, Some(e)),
                Item::Collection(c) => key_url.expand(&key_defaults, Some(c)),
            })
            .associate_fn(move |e| {
                let key = assoc_url.expand(&assoc_defaults, Some(e));
                vec![strip_last_segment(&key).to_owned()]
            })
            .build()
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Fetch one record, from the store when it holds one.
    pub async fn get(&self, params: &Params) -> Result<Element, CoreError> {
        let params = self.defaults.merged(params);
        let key = self.url.expand(&params, None);

        if let Some(element) = self.store.as_ref().and_then(|s| s.get_element(&key)) {
            debug!(key = %key, "served from store");
            return Ok(element);
        }

        let value = self.client.get(&key).await?;
        let element = Element::from_value(value)?;
        if let Some(store) = &self.store {
            store.put_at(key, element.clone())?;
        }
        Ok(element)
    }

    /// Fetch the list at this resource's URL.
    pub async fn query(&self, params: &Params) -> Result<Collection, CoreError> {
        self.list(&self.url, params).await
    }

    /// Fetch a list from an alternative URL, such as a nested route.
    pub async fn query_at(
        &self,
        url: &UrlTemplate,
        params: &Params,
    ) -> Result<Collection, CoreError> {
        self.list(url, params).await
    }

    async fn list(&self, url: &UrlTemplate, params: &Params) -> Result<Collection, CoreError> {
        let params = self.defaults.merged(params);
        let key = url.expand(&params, None);

        if let Some(collection) = self.store.as_ref().and_then(|s| s.get_collection(&key)) {
            debug!(key = %key, "served from store");
            return Ok(collection);
        }

        let Value::Array(values) = self.client.get(&key).await? else {
            return Err(StoreError::Unclassifiable {
                found: format!("a non-list response from {key}"),
            }
            .into());
        };

        let attributes = params.literals();
        let mut members = Vec::with_capacity(values.len());
        for value in values {
            let element = Element::from_value(value)?;
            for name in &self.inherited {
                if let Some(attr) = attributes.get(name) {
                    if element.get(name).is_none_or(|v| v.is_null()) {
                        element.set_field(name, attr.clone());
                    }
                }
            }
            members.push(self.canonical(element));
        }

        let collection = Collection::with_members(attributes, members);
        if let Some(store) = &self.store {
            store.put_at(key, collection.clone())?;
        }
        Ok(collection)
    }

    /// The stored element for the same key, if any.
    fn canonical(&self, element: Element) -> Element {
        let Some(store) = &self.store else {
            return element;
        };
        let key = store.key_of(&Item::Element(element.clone()));
        store.get_element(&key).unwrap_or(element)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// POST `element`, then copy the server's answer into it.
    pub async fn create(&self, element: &Element) -> Result<(), CoreError> {
        self.write(Method::Post, element).await
    }

    /// PUT `element`, then copy the server's answer into it.
    pub async fn update(&self, element: &Element) -> Result<(), CoreError> {
        self.write(Method::Put, element).await
    }

    /// Update when `element` has an id, create otherwise.
    pub async fn save(&self, element: &Element) -> Result<(), CoreError> {
        if has_id(element) {
            self.update(element).await
        } else {
            self.create(element).await
        }
    }

    /// DELETE `element` and drop it from the store.
    pub async fn delete(&self, element: &Element) -> Result<(), CoreError> {
        self.ensure_writable("delete")?;
        Self::ensure_identified(element, "delete")?;
        let path = self.url.expand(&self.defaults, Some(element));

        self.client.delete(&path).await?;
        if let Some(store) = &self.store {
            store.remove(&path);
        }
        Ok(())
    }

    async fn write(&self, method: Method, element: &Element) -> Result<(), CoreError> {
        let action = if method == Method::Put { "update" } else { "create" };
        self.ensure_writable(action)?;
        if method == Method::Put {
            Self::ensure_identified(element, action)?;
        }
        let path = self.url.expand(&self.defaults, Some(element));
        let body = element.to_value();

        let response = self.client.request(method, &path, Some(&body)).await?;
        if let Value::Object(fields) = response {
            element.assign(fields);
        }

        // Without an id the element would land on the list key.
        if !has_id(element) {
            debug!(path = %path, "written element has no id, not storing it");
            return Ok(());
        }
        if let Some(store) = &self.store {
            let key = self.url.expand(&self.defaults, Some(element));
            store.put_at(key, element.clone())?;
        }
        Ok(())
    }

    fn ensure_identified(element: &Element, action: &str) -> Result<(), CoreError> {
        if has_id(element) {
            return Ok(());
        }
        Err(CoreError::ValidationFailed {
            message: format!("cannot {action} an element without an id"),
        })
    }

    fn ensure_writable(&self, action: &str) -> Result<(), CoreError> {
        if self.read_only {
            return Err(CoreError::Unsupported {
                operation: action.into(),
                resource: self.url.to_string(),
            });
        }
        Ok(())
    }
}

fn has_id(element: &Element) -> bool {
    element.id().is_some_and(|id| !id.is_null())
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("url", &self.url)
            .field("read_only", &self.read_only)
            .field("stored", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn categories_store() -> Store {
        Resource::default_store(
            &UrlTemplate::new("/categories/:id"),
            &Params::from([("id", "@id")]),
        )
        .unwrap()
    }

    #[test]
    fn default_store_keys_elements_by_template() {
        let store = categories_store();
        let e = Element::from_value(json!({ "id": 3, "caption": "Rent" })).unwrap();
        store.put(e.clone()).unwrap();
        assert!(store.get_element("/categories/3").unwrap().ptr_eq(&e));
    }

    #[test]
    fn default_store_associates_elements_with_list() {
        let store = categories_store();
        let list = Collection::new();
        store.put(list.clone()).unwrap();
        assert!(store.has("/categories/"));

        let e = Element::from_value(json!({ "id": 3 })).unwrap();
        store.put(e.clone()).unwrap();
        assert!(list.contains(&e));
    }

    #[test]
    fn default_store_keys_collections_by_attributes() {
        let store = Resource::default_store(
            &UrlTemplate::new("/months/:monthid/categories/:id"),
            &Params::from([("monthid", "@monthid"), ("id", "@id")]),
        )
        .unwrap();
        let list = Collection::new();
        list.set_attribute("monthid", 557);
        store.put(list).unwrap();
        assert!(store.has("/months/557/categories/"));

        let e = Element::from_value(json!({ "id": 1, "monthid": 557 })).unwrap();
        store.put(e.clone()).unwrap();
        assert!(store.get_collection("/months/557/categories/").unwrap().contains(&e));
    }
}
