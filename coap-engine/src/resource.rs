// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The resource tree: a rooted, ordered trie of URI path segments, and the
//! delivery logic that walks it to route an inbound request to a handler.
//!
//! Observe relations ([RFC 7641]) are tracked per resource and per remote
//! endpoint here, since registering or canceling one needs to know which
//! resource is being addressed — something [`crate::stack::observe`]
//! deliberately does not know.
//!
//! [RFC 7641]: https://tools.ietf.org/html/rfc7641

use crate::consts::{OBSERVE_DEREGISTER, OBSERVE_REGISTER};
use crate::exchange::Exchange;
use crate::link_format::{
    LinkFormatWrite, LINK_ATTR_INTERFACE_DESCRIPTION, LINK_ATTR_MAXIMUM_SIZE_ESTIMATE,
    LINK_ATTR_RESOURCE_TYPE, LINK_ATTR_TITLE,
};
use crate::message::{MessageRead, MsgCode, MsgToken, OwnedImmutableMessage};
use crate::option::OptionNumber;
use crate::uri::RelRef;
use crate::Error;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

/// A method handler: given the full inbound request, produces a response.
pub type Handler = dyn Fn(&OwnedImmutableMessage) -> Result<OwnedImmutableMessage, Error> + Send + Sync;

/// Static metadata describing a resource, reported via `/.well-known/core`
/// (RFC 6690) and consulted when deciding whether a resource accepts
/// observers.
#[derive(Default)]
pub struct ResourceAttributes {
    pub title: Option<String>,
    pub resource_type: Option<String>,
    pub interface: Option<String>,
    pub content_format: Option<u16>,
    pub size_estimate: Option<u32>,
}

/// One node in the resource tree. A node may have a handler for some
/// subset of methods, be observable, and have any number of named
/// children.
pub struct Resource {
    name: String,
    visible: bool,
    observable: bool,
    attributes: ResourceAttributes,
    handlers: HashMap<MsgCode, Arc<Handler>>,
    children: HashMap<String, Resource>,
    relations: Mutex<HashMap<SocketAddr, Vec<Arc<ObserveRelation>>>>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("visible", &self.visible)
            .field("observable", &self.observable)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Resource {
    /// Creates a new, handler-less node named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Resource {
            name: name.into(),
            visible: true,
            observable: false,
            attributes: ResourceAttributes::default(),
            handlers: HashMap::new(),
            children: HashMap::new(),
            relations: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_observable(mut self, observable: bool) -> Self {
        self.observable = observable;
        self
    }

    pub fn with_attributes(mut self, attributes: ResourceAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Registers `handler` to run for requests whose method matches `code`.
    pub fn with_handler(
        mut self,
        code: MsgCode,
        handler: impl Fn(&OwnedImmutableMessage) -> Result<OwnedImmutableMessage, Error> + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(code, Arc::new(handler));
        self
    }

    /// Attaches `child` under this node, replacing any existing child with
    /// the same name.
    pub fn with_child(mut self, child: Resource) -> Self {
        self.children.insert(child.name.clone(), child);
        self
    }

    pub fn is_observable(&self) -> bool {
        self.observable
    }

    fn handler_for(&self, code: MsgCode) -> Option<Arc<Handler>> {
        self.handlers.get(&code).cloned()
    }

    fn active_observer_count(&self) -> usize {
        self.relations
            .lock()
            .expect("relations lock poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Re-runs this resource's `GET` handler once per active observe
    /// relation, pairing each surviving relation with a freshly generated
    /// notification body. This is the server-initiated push half of RFC
    /// 7641: it runs independent of any new inbound request, so a resource
    /// whose state changes on its own (a sensor reading, a counter) can
    /// still reach observers that registered long ago. Relations whose
    /// exchange has since been dropped are pruned as a side effect.
    pub fn notify(&self) -> Result<Vec<(Arc<ObserveRelation>, OwnedImmutableMessage)>, Error> {
        let handler = match self.handler_for(MsgCode::MethodGet) {
            Some(handler) => handler,
            None => return Ok(Vec::new()),
        };

        let mut relations = self.relations.lock().expect("relations lock poisoned");
        relations.retain(|_, rels| {
            rels.retain(|relation| relation.exchange().is_some());
            !rels.is_empty()
        });

        let mut notifications = Vec::new();
        for rels in relations.values() {
            for relation in rels {
                let response = handler(&relation.request)?;
                notifications.push((Arc::clone(relation), response));
            }
        }
        Ok(notifications)
    }
}

/// An edge between a remote endpoint and an observable resource, created by
/// a `GET` carrying `Observe: 0` and torn down by a matching `Observe: 1`,
/// by an RST, or by a failed confirmable notification.
pub struct ObserveRelation {
    remote: SocketAddr,
    token: MsgToken,
    exchange: Weak<Exchange>,
    established_at: Instant,
    /// The request that established this relation, replayed through the
    /// resource's handler on every push notification.
    request: OwnedImmutableMessage,
}

impl fmt::Debug for ObserveRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserveRelation")
            .field("remote", &self.remote)
            .field("token", &self.token)
            .field("age", &self.established_at.elapsed())
            .finish()
    }
}

impl ObserveRelation {
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn token(&self) -> MsgToken {
        self.token
    }

    /// The exchange this relation notifies through, if it hasn't been
    /// dropped out from under us (e.g. the matcher expired it).
    pub fn exchange(&self) -> Option<Arc<Exchange>> {
        self.exchange.upgrade()
    }

    /// The request that registered this relation, reused to re-run the
    /// resource's handler for each push notification.
    pub fn request(&self) -> OwnedImmutableMessage {
        self.request.clone()
    }
}

/// Groups every [`ObserveRelation`] a single remote endpoint holds across
/// the whole tree, so a disconnect (or an RST on any one exchange) can be
/// used to clean up the rest cheaply. Not yet wired to a transport-level
/// disconnect signal; today relations are pruned individually as their
/// owning exchange completes.
#[derive(Debug, Default)]
pub struct ObservingEndpoint {
    pub remote: Option<SocketAddr>,
}

/// The outcome of delivering a request to the tree.
#[derive(Debug)]
pub enum Delivery {
    /// A handler ran and produced this response.
    Response(OwnedImmutableMessage),
    /// No resource matched the request path.
    NotFound,
    /// A resource matched, but has no handler for this method.
    MethodNotAllowed,
}

/// Rooted trie of [`Resource`]s plus the logic to route a decoded request
/// to the right handler and manage the observe relations that requests
/// establish along the way. One tree belongs to exactly one endpoint.
#[derive(Debug)]
pub struct ResourceTree {
    root: Resource,
}

impl ResourceTree {
    pub fn new(root: Resource) -> Self {
        ResourceTree { root }
    }

    /// Routes `request` to the resource addressed by its Uri-Path options,
    /// handling Observe registration/deregistration first if the request is
    /// a `GET` carrying the option, then invoking the matched method
    /// handler.
    pub fn deliver(
        &self,
        request: &OwnedImmutableMessage,
        exchange: &Arc<Exchange>,
        remote: SocketAddr,
    ) -> Result<Delivery, Error> {
        let path = uri_path_segments(request)?;
        let resource = match walk(&self.root, &path) {
            Some(resource) => resource,
            None => return Ok(Delivery::NotFound),
        };

        let code = request.msg_code();
        if code == MsgCode::MethodGet {
            if let Some(observe) = observe_option(request)? {
                self.apply_observe(resource, observe, request, exchange, remote);
            }
        }

        match resource.handler_for(code) {
            Some(handler) => Ok(Delivery::Response(handler(request)?)),
            None => Ok(Delivery::MethodNotAllowed),
        }
    }

    fn apply_observe(
        &self,
        resource: &Resource,
        observe: u32,
        request: &OwnedImmutableMessage,
        exchange: &Arc<Exchange>,
        remote: SocketAddr,
    ) {
        if !resource.observable {
            return;
        }

        let token = request.msg_token();
        let mut relations = resource.relations.lock().expect("relations lock poisoned");
        let entry = relations.entry(remote).or_insert_with(Vec::new);

        match observe {
            OBSERVE_REGISTER => {
                entry.retain(|r| r.token != token);
                entry.push(Arc::new(ObserveRelation {
                    remote,
                    token,
                    exchange: Arc::downgrade(exchange),
                    established_at: Instant::now(),
                    request: request.clone(),
                }));
                exchange.set_observing(true);
            }
            OBSERVE_DEREGISTER => {
                entry.retain(|r| r.token != token);
                exchange.set_observing(false);
            }
            _ => {}
        }

        if entry.is_empty() {
            relations.remove(&remote);
        }
    }

    /// Finds the resource addressed by `path`'s segments, if any — the same
    /// trie walk [`ResourceTree::deliver`] uses, exposed for server-initiated
    /// pushes that have no inbound request to route.
    pub fn find(&self, path: &[&str]) -> Option<&Resource> {
        let mut node = &self.root;
        for segment in path {
            node = node.children.get(*segment)?;
        }
        Some(node)
    }

    /// Renders this tree's visible, discoverable resources as an RFC 6690
    /// link-format document, as served from `/.well-known/core`.
    pub fn to_link_format(&self) -> Result<String, Error> {
        let mut out = String::new();
        let mut writer = LinkFormatWrite::new(&mut out);
        write_links(&self.root, "", &mut writer)?;
        writer.finish()?;
        Ok(out)
    }
}

fn write_links<T: fmt::Write + ?Sized>(
    resource: &Resource,
    prefix: &str,
    writer: &mut LinkFormatWrite<'_, T>,
) -> Result<(), Error> {
    let path = format!("{}/{}", prefix, resource.name);

    if (!prefix.is_empty() || !resource.name.is_empty()) && resource.visible {
        let rel = RelRef::from_str(&path).map_err(|_| Error::InvariantViolation)?;
        let mut link = writer.link(rel);
        if let Some(title) = &resource.attributes.title {
            link = link.attr_quoted(LINK_ATTR_TITLE, title);
        }
        if let Some(rt) = &resource.attributes.resource_type {
            link = link.attr_quoted(LINK_ATTR_RESOURCE_TYPE, rt);
        }
        if let Some(iface) = &resource.attributes.interface {
            link = link.attr_quoted(LINK_ATTR_INTERFACE_DESCRIPTION, iface);
        }
        if let Some(sz) = resource.attributes.size_estimate {
            link = link.attr_u32(LINK_ATTR_MAXIMUM_SIZE_ESTIMATE, sz);
        }
        let _ = link;
    }

    for child in resource.children.values() {
        write_links(child, &path, writer)?;
    }

    Ok(())
}

fn walk<'a>(root: &'a Resource, path: &[String]) -> Option<&'a Resource> {
    let mut node = root;
    for segment in path {
        node = node.children.get(segment)?;
    }
    Some(node)
}

fn uri_path_segments(request: &OwnedImmutableMessage) -> Result<Vec<String>, Error> {
    let mut segments = Vec::new();
    for opt in request.options() {
        let (key, value) = opt?;
        if key == OptionNumber::URI_PATH {
            segments.push(
                std::str::from_utf8(value)
                    .map_err(|_| Error::InvariantViolation)?
                    .to_string(),
            );
        }
    }
    Ok(segments)
}

fn observe_option(request: &OwnedImmutableMessage) -> Result<Option<u32>, Error> {
    for opt in request.options() {
        let (key, value) = opt?;
        if key == OptionNumber::OBSERVE {
            let mut buf = [0u8; 4];
            buf[4 - value.len()..].copy_from_slice(value);
            return Ok(Some(u32::from_be_bytes(buf)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::Origin;
    use crate::message::{MessageWrite, MsgType, VecMessageEncoder};

    fn request_for(path: &[&str], code: MsgCode, observe: Option<u32>) -> OwnedImmutableMessage {
        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(MsgType::Con);
        encoder.set_msg_code(code);
        encoder.set_msg_id(1);
        encoder.set_msg_token(MsgToken::new(&[7]));
        if let Some(observe) = observe {
            crate::option::OptionInsert::insert_option_with_u32(&mut encoder, OptionNumber::OBSERVE, observe)
                .unwrap();
        }
        for segment in path {
            crate::option::OptionInsert::insert_option_with_str(&mut encoder, OptionNumber::URI_PATH, segment)
                .unwrap();
        }
        let bytes: Vec<u8> = encoder.into();
        OwnedImmutableMessage::new(bytes).unwrap()
    }

    fn ok_response() -> OwnedImmutableMessage {
        let mut encoder = VecMessageEncoder::default();
        encoder.set_msg_type(MsgType::Ack);
        encoder.set_msg_code(MsgCode::SuccessContent);
        let bytes: Vec<u8> = encoder.into();
        OwnedImmutableMessage::new(bytes).unwrap()
    }

    fn build_tree() -> ResourceTree {
        let temp = Resource::new("temp")
            .with_observable(true)
            .with_handler(MsgCode::MethodGet, |_req| Ok(ok_response()));
        let sensors = Resource::new("sensors").with_visible(false).with_child(temp);
        ResourceTree::new(Resource::new("").with_child(sensors))
    }

    #[test]
    fn routes_to_nested_resource() {
        let tree = build_tree();
        let exchange = Arc::new(Exchange::new(Origin::Remote));
        let request = request_for(&["sensors", "temp"], MsgCode::MethodGet, None);
        match tree.deliver(&request, &exchange, "127.0.0.1:1234".parse().unwrap()).unwrap() {
            Delivery::Response(_) => {}
            other => panic!("expected a response, got {:?}", other),
        }
    }

    #[test]
    fn missing_resource_is_not_found() {
        let tree = build_tree();
        let exchange = Arc::new(Exchange::new(Origin::Remote));
        let request = request_for(&["sensors", "humidity"], MsgCode::MethodGet, None);
        assert!(matches!(
            tree.deliver(&request, &exchange, "127.0.0.1:1234".parse().unwrap()).unwrap(),
            Delivery::NotFound
        ));
    }

    #[test]
    fn observe_register_then_deregister_toggles_exchange_flag() {
        let tree = build_tree();
        let remote: SocketAddr = "127.0.0.1:1234".parse().unwrap();

        let register_exchange = Arc::new(Exchange::new(Origin::Remote));
        let register = request_for(&["sensors", "temp"], MsgCode::MethodGet, Some(0));
        tree.deliver(&register, &register_exchange, remote).unwrap();
        assert!(register_exchange.is_observing());

        let deregister_exchange = Arc::new(Exchange::new(Origin::Remote));
        let deregister = request_for(&["sensors", "temp"], MsgCode::MethodGet, Some(1));
        tree.deliver(&deregister, &deregister_exchange, remote).unwrap();
        assert!(!deregister_exchange.is_observing());
    }

    #[test]
    fn link_format_output_skips_hidden_resources() {
        let tree = build_tree();
        let rendered = tree.to_link_format().unwrap();
        assert!(!rendered.contains("/sensors>"));
    }
}
