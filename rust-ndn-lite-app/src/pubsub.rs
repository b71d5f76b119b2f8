//! Secure publish/subscribe on top of the forwarder.
//!
//! Content lives under `/<home>/<service>/DATA/<device-id>/<data-id>` and is
//! served by one suppress-strategy producer per service. Commands travel as
//! Interests named `/<home>/<service>/CMD/<scope...>/<data-id>/<timestamp>`
//! whose parameters carry the signed command Data and, optionally, the
//! signer's certificate. Subscribers verify the command against their key
//! storage and the trust schema before the callback sees it.

use bytes::Bytes;
use log::{debug, info, trace};
use rust_ndn_lite_common::{
    ndn::encode_elements,
    tlv::{TlvElement, TlvReader, TLV_APP_BASE},
    types::{HandlerId, PendingId, TaskId},
    Data, Error, Interest, Name, NameComponent, SignatureType,
};
use rust_ndn_lite_forwarder::{Forwarder, Strategy};
use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::{
    identity::DeviceIdentity,
    service::ServiceId,
    trust_schema::{TrustSchema, TrustSchemaRule},
};

pub const CONTENT_COMPONENT: &str = "DATA";
pub const COMMAND_COMPONENT: &str = "CMD";

/// Command parameters: the signed command Data.
pub const TLV_PS_COMMAND: u8 = TLV_APP_BASE;
/// Command parameters: the signer's certificate.
pub const TLV_PS_SIGNER_CERT: u8 = TLV_APP_BASE + 1;

/// Freshness of published content.
pub const CONTENT_FRESHNESS_MS: u64 = 10_000;

/// One published or received item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub data_id: String,
    pub payload: Bytes,
}

impl Event {
    pub fn new(data_id: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            data_id: data_id.into(),
            payload: payload.into(),
        }
    }
}

/// Where an accepted command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub service: ServiceId,
    pub scope: Name,
    /// Key name that signed the command.
    pub publisher: Name,
    /// Milliseconds since the Unix epoch, as stamped by the publisher.
    pub timestamp: u64,
}

#[derive(Debug)]
struct State {
    identity: DeviceIdentity,
    schema: TrustSchema,
    content: HashMap<(ServiceId, String), Data>,
    producers: HashMap<ServiceId, HandlerId>,
    lifetime_ms: u64,
}

/// Pub/sub endpoint of one identity. Clones share state.
#[derive(Debug, Clone)]
pub struct PubSub {
    inner: Rc<RefCell<State>>,
}

impl PubSub {
    /// Endpoint for `identity`, trusting only the controller until more
    /// rules are added. Rules added here apply to every subscription made
    /// afterwards.
    pub fn new(identity: DeviceIdentity) -> Self {
        let mut schema = TrustSchema::new();
        schema.add_rule(TrustSchemaRule::controller_only(identity.home_prefix()));
        Self {
            inner: Rc::new(RefCell::new(State {
                identity,
                schema,
                content: HashMap::new(),
                producers: HashMap::new(),
                lifetime_ms: rust_ndn_lite_common::ndn::DEFAULT_INTEREST_LIFETIME_MS,
            })),
        }
    }

    /// Lifetime of command and content Interests.
    pub fn with_lifetime(self, lifetime_ms: u64) -> Self {
        self.inner.borrow_mut().lifetime_ms = lifetime_ms;
        self
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.inner.borrow().identity.clone()
    }

    pub fn add_rule(&self, rule: TrustSchemaRule) {
        self.inner.borrow_mut().schema.add_rule(rule);
    }

    pub fn schema(&self) -> TrustSchema {
        self.inner.borrow().schema.clone()
    }

    fn service_prefix(&self, service: ServiceId, kind: &str) -> Result<Name, Error> {
        self.inner
            .borrow()
            .identity
            .home_prefix()
            .append(service.component())?
            .append(kind)
    }

    /// `/<home>/<service>/DATA/<device-id>/<data-id>`
    pub fn content_name(&self, service: ServiceId, device_id: &str, data_id: &str) -> Result<Name, Error> {
        self.service_prefix(service, CONTENT_COMPONENT)?.append(device_id)?.append(data_id)
    }

    /* ---------------------------------------------------------------- *
     * Content
     * ---------------------------------------------------------------- */

    /// Sign `event` as this device's latest content for `data_id` and serve
    /// it on request.
    pub fn publish_content(&self, fwd: &mut Forwarder, service: ServiceId, event: &Event) -> Result<Name, Error> {
        let device_id = self.inner.borrow().identity.device_id().to_string();
        let name = self.content_name(service, &device_id, &event.data_id)?;
        let mut data = Data::new(name.clone(), event.payload.clone()).with_freshness(CONTENT_FRESHNESS_MS);
        data.sign(self.inner.borrow().identity.signer())?;

        let registered = {
            let mut state = self.inner.borrow_mut();
            state.content.insert((service, event.data_id.clone()), data);
            state.producers.contains_key(&service)
        };
        if !registered {
            let prefix = self.service_prefix(service, CONTENT_COMPONENT)?.append(device_id.as_str())?;
            let depth = prefix.len();
            let pubsub = self.clone();
            let id = fwd.register_prefix(&prefix, move |fwd: &mut Forwarder, interest: &Interest| {
                let data_id = interest.name.get(depth).and_then(|c| c.as_str()).map(str::to_string);
                let stored = data_id.and_then(|id| pubsub.inner.borrow().content.get(&(service, id)).cloned());
                match stored {
                    Some(data) => {
                        fwd.put_data(&data);
                    }
                    None => debug!("No content for {}", interest.name),
                }
                Strategy::Suppress
            })?;
            self.inner.borrow_mut().producers.insert(service, id);
            info!("Serving {} content under {}", service, prefix);
        }
        trace!("Published {}", name);
        Ok(name)
    }

    /// Publish now and then again every `interval`.
    pub fn publish_content_periodically(
        &self,
        fwd: &mut Forwarder,
        service: ServiceId,
        event: Event,
        interval: Duration,
    ) -> Result<TaskId, Error> {
        self.publish_content(fwd, service, &event)?;
        let pubsub = self.clone();
        Ok(fwd.schedule_periodic(interval, move |fwd| {
            if let Err(e) = pubsub.publish_content(fwd, service, &event) {
                debug!("Periodic publish of {} failed: {}", event.data_id, e);
            }
        }))
    }

    /// Fetch `/<home>/<service>/DATA/<device-id>/<data-id>` now and every
    /// `interval`. Data is checked by the forwarder's key storage, so the
    /// publisher's certificate must be installed there.
    pub fn subscribe_to_content(
        &self,
        fwd: &mut Forwarder,
        service: ServiceId,
        device_id: &str,
        data_id: &str,
        interval: Duration,
        callback: impl FnMut(&mut Forwarder, &Event) + 'static,
    ) -> Result<TaskId, Error> {
        let name = self.content_name(service, device_id, data_id)?;
        let lifetime = self.inner.borrow().lifetime_ms;
        let callback: Rc<RefCell<dyn FnMut(&mut Forwarder, &Event)>> = Rc::new(RefCell::new(callback));
        let data_id = data_id.to_string();

        let fetch = move |fwd: &mut Forwarder| {
            let callback = Rc::clone(&callback);
            let data_id = data_id.clone();
            let interest = Interest::new(name.clone()).with_must_be_fresh(true).with_lifetime(lifetime);
            let result = fwd.express_interest(
                interest,
                move |fwd, data| {
                    let event = Event::new(data_id, data.content.clone());
                    (&mut *callback.borrow_mut())(fwd, &event);
                },
                |_, interest| debug!("Content fetch {} timed out", interest.name),
            );
            if let Err(e) = result {
                debug!("Content fetch failed: {}", e);
            }
        };
        fetch(fwd);
        Ok(fwd.schedule_periodic(interval, fetch))
    }

    /* ---------------------------------------------------------------- *
     * Commands
     * ---------------------------------------------------------------- */

    /// `/<home>/<service>/CMD/<scope...>/<data-id>/<timestamp>`
    pub fn command_name(&self, service: ServiceId, scope: &Name, data_id: &str, timestamp: u64) -> Result<Name, Error> {
        self.service_prefix(service, COMMAND_COMPONENT)?
            .join(scope)?
            .append(data_id)?
            .append(NameComponent::from_number(timestamp))
    }

    /// Sign a command and send it to the subscribers of `scope`.
    pub fn publish_command(
        &self,
        fwd: &mut Forwarder,
        service: ServiceId,
        scope: &Name,
        event: &Event,
    ) -> Result<PendingId, Error> {
        let name = self.command_name(service, scope, &event.data_id, now_ms())?;
        let (params, lifetime) = {
            let state = self.inner.borrow();
            let mut command = Data::new(name.clone(), event.payload.clone());
            command.sign(state.identity.signer())?;
            let mut elements = vec![TlvElement::new(TLV_PS_COMMAND, command.encode())];
            if !state.identity.is_anchor() {
                elements.push(TlvElement::new(TLV_PS_SIGNER_CERT, state.identity.certificate().encode()));
            }
            (encode_elements(&elements), state.lifetime_ms)
        };

        let interest = Interest::new(name).with_parameters(params).with_lifetime(lifetime);
        debug!("Publishing command {}", interest.name);
        fwd.express_interest(
            interest,
            |_, ack| debug!("Command {} acknowledged", ack.name),
            |_, interest| debug!("Command {} not acknowledged", interest.name),
        )
    }

    /// Subscribe to commands for `scope` under the endpoint's schema,
    /// controller-only unless rules were added.
    pub fn subscribe_to_command(
        &self,
        fwd: &mut Forwarder,
        service: ServiceId,
        scope: &Name,
        callback: impl FnMut(&mut Forwarder, &EventContext, &Event) + 'static,
    ) -> Result<HandlerId, Error> {
        let schema = self.schema();
        self.subscribe(fwd, service, scope, schema, callback)
    }

    /// Subscribe to commands for `scope`, trusting `rule` for this
    /// subscription only. Other subscriptions never see the rule.
    pub fn subscribe_to_command_with_rule(
        &self,
        fwd: &mut Forwarder,
        service: ServiceId,
        scope: &Name,
        rule: TrustSchemaRule,
        callback: impl FnMut(&mut Forwarder, &EventContext, &Event) + 'static,
    ) -> Result<HandlerId, Error> {
        let mut schema = self.schema();
        schema.add_rule(rule);
        self.subscribe(fwd, service, scope, schema, callback)
    }

    fn subscribe(
        &self,
        fwd: &mut Forwarder,
        service: ServiceId,
        scope: &Name,
        schema: TrustSchema,
        mut callback: impl FnMut(&mut Forwarder, &EventContext, &Event) + 'static,
    ) -> Result<HandlerId, Error> {
        let prefix = self.service_prefix(service, COMMAND_COMPONENT)?.join(scope)?;
        let pubsub = self.clone();
        let id = fwd.register_prefix(&prefix, move |fwd: &mut Forwarder, interest: &Interest| {
            match pubsub.verify_command(fwd, service, &schema, interest) {
                Ok((context, event)) => {
                    callback(fwd, &context, &event);
                    let mut ack = Data::new(interest.name.clone(), Bytes::new());
                    ack.encode_digest_sign();
                    fwd.put_data(&ack);
                }
                Err(e) => debug!("Dropping command {}: {}", interest.name, e),
            }
            Strategy::Suppress
        })?;
        info!("Subscribed to {} commands under {}", service, prefix);
        Ok(id)
    }

    /// Verify a command Interest against the endpoint's schema and extract
    /// its event.
    pub fn accept_command(
        &self,
        fwd: &Forwarder,
        service: ServiceId,
        interest: &Interest,
    ) -> Result<(EventContext, Event), Error> {
        let schema = self.schema();
        self.verify_command(fwd, service, &schema, interest)
    }

    fn verify_command(
        &self,
        fwd: &Forwarder,
        service: ServiceId,
        schema: &TrustSchema,
        interest: &Interest,
    ) -> Result<(EventContext, Event), Error> {
        let params = interest
            .parameters
            .clone()
            .ok_or_else(|| Error::MalformedPacket("command without parameters".into()))?;
        let mut reader = TlvReader::new(params);
        let command = Data::decode(&reader.expect(TLV_PS_COMMAND)?.value)?;
        let signer_cert = match reader.read_optional(TLV_PS_SIGNER_CERT)? {
            Some(element) => Some(Data::decode(&element.value)?),
            None => None,
        };
        reader.finish()?;

        if command.name != interest.name {
            return Err(Error::VerificationFailure(format!(
                "command {} does not match {}",
                command.name, interest.name
            )));
        }
        // Only an ECDSA signature binds the command to the key it names.
        if command.signature.info.signature_type != SignatureType::EcdsaSha256 {
            return Err(Error::VerificationFailure(format!(
                "command {} is not ECDSA-signed",
                command.name
            )));
        }
        let publisher = command
            .signature
            .info
            .key_locator
            .clone()
            .ok_or_else(|| Error::VerificationFailure("unsigned command".into()))?;

        let keys = fwd.keys();
        if keys.verify_data(&command).is_err() {
            match &signer_cert {
                Some(cert) => keys.verify_with_certificate(&command, cert)?,
                None => return Err(Error::VerificationFailure(format!("unknown signer {}", publisher))),
            }
        }
        schema.verify(&command.name, &publisher)?;

        let home_len = self.inner.borrow().identity.home_prefix().len();
        let name = &command.name;
        let len = name.len();
        if len < home_len + 4 || name.get(home_len) != Some(&service.component()) {
            return Err(Error::InvalidName(format!("{} is not a {} command", name, service)));
        }
        let data_id = name
            .get(len - 2)
            .and_then(|c| c.as_str())
            .ok_or_else(|| Error::InvalidName(format!("{} has no data identifier", name)))?
            .to_string();
        let timestamp = name
            .get(len - 1)
            .and_then(|c| <[u8; 8]>::try_from(c.as_bytes().as_ref()).ok())
            .map(u64::from_be_bytes)
            .ok_or_else(|| Error::InvalidName(format!("{} has no timestamp", name)))?;
        let scope = Name::from_components(name.components().skip(home_len + 2).take(len - home_len - 4).cloned().collect())?;

        Ok((
            EventContext {
                service,
                scope,
                publisher,
                timestamp,
            },
            Event::new(data_id, command.content),
        ))
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{issue_certificate, self_signed_certificate};
    use rust_ndn_lite_common::security::{sha256, EcdsaSigner};
    use rust_ndn_lite_forwarder::{ChannelFace, ForwarderConfig, ManualClock};
    use std::cell::Cell;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    struct Home {
        controller: DeviceIdentity,
        anchor_cert: Data,
        anchor_signer: EcdsaSigner,
    }

    impl Home {
        fn new() -> Self {
            let anchor_signer = EcdsaSigner::generate(&name("/home")).unwrap();
            let controller = DeviceIdentity::anchor(anchor_signer.clone()).unwrap();
            Self {
                anchor_cert: controller.anchor_certificate().clone(),
                controller,
                anchor_signer,
            }
        }

        fn device(&self, id: &str) -> DeviceIdentity {
            let signer = EcdsaSigner::generate(&name("/tmp")).unwrap();
            let cert = issue_certificate(
                &self.anchor_signer,
                &name("/home").append(id).unwrap(),
                &signer.public_key_bytes(),
            )
            .unwrap();
            DeviceIdentity::new(id, signer, cert, self.anchor_cert.clone()).unwrap()
        }

        fn forwarder(&self) -> Forwarder {
            let mut fwd = Forwarder::with_clock(ForwarderConfig::default(), ManualClock::new());
            fwd.keys_mut().set_trust_anchor(self.anchor_cert.clone()).unwrap();
            fwd
        }
    }

    /// Two forwarders joined by a face, each routing the home prefix to the
    /// other.
    fn link(a: &mut Forwarder, b: &mut Forwarder) {
        let (fa, fb) = ChannelFace::pair();
        let ia = a.add_face(fa).unwrap();
        let ib = b.add_face(fb).unwrap();
        a.add_route(&name("/home"), ia).unwrap();
        b.add_route(&name("/home"), ib).unwrap();
    }

    fn pump(a: &mut Forwarder, b: &mut Forwarder) {
        for _ in 0..3 {
            a.process();
            b.process();
        }
    }

    #[test]
    fn test_controller_command_reaches_subscriber() {
        let home = Home::new();
        let mut light = home.forwarder();
        let mut ctrl = home.forwarder();
        link(&mut light, &mut ctrl);

        let received = Rc::new(RefCell::new(Vec::new()));
        let r = Rc::clone(&received);
        PubSub::new(home.device("light"))
            .subscribe_to_command(&mut light, ServiceId::LED, &Name::new(), move |_, ctx, event| {
                r.borrow_mut().push((ctx.scope.clone(), event.clone()));
            })
            .unwrap();

        let acked = light.metrics().snapshot().data_sent;
        PubSub::new(home.controller.clone())
            .publish_command(&mut ctrl, ServiceId::LED, &name("/bedroom"), &Event::new("brightness", &b"7"[..]))
            .unwrap();
        pump(&mut ctrl, &mut light);

        assert_eq!(
            *received.borrow(),
            vec![(name("/bedroom"), Event::new("brightness", &b"7"[..]))]
        );
        assert_eq!(light.metrics().snapshot().data_sent, acked + 1);
    }

    #[test]
    fn test_untrusted_command_never_delivered() {
        let home = Home::new();
        let mut light = home.forwarder();
        let mut rogue = home.forwarder();
        link(&mut light, &mut rogue);

        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        PubSub::new(home.device("light"))
            .subscribe_to_command(&mut light, ServiceId::LED, &Name::new(), move |_, _, _| h.set(h.get() + 1))
            .unwrap();

        // A certified device is still not the controller.
        PubSub::new(home.device("switch"))
            .publish_command(&mut rogue, ServiceId::LED, &Name::new(), &Event::new("on", &b"1"[..]))
            .unwrap();

        // Self-made certificate chained to nothing.
        let stranger = EcdsaSigner::generate(&name("/home")).unwrap();
        let fake_anchor = self_signed_certificate(&stranger).unwrap();
        let signer = EcdsaSigner::generate(&name("/tmp")).unwrap();
        let cert = issue_certificate(&stranger, &name("/home/evil"), &signer.public_key_bytes()).unwrap();
        let evil = DeviceIdentity::new("evil", signer, cert, fake_anchor).unwrap();
        PubSub::new(evil)
            .publish_command(&mut rogue, ServiceId::LED, &Name::new(), &Event::new("on", &b"1"[..]))
            .unwrap();

        pump(&mut rogue, &mut light);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_rule_admits_room_device() {
        let home = Home::new();
        let mut light = home.forwarder();
        let mut switch = home.forwarder();
        link(&mut light, &mut switch);

        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        PubSub::new(home.device("light"))
            .subscribe_to_command_with_rule(
                &mut light,
                ServiceId::LED,
                &name("/bedroom"),
                TrustSchemaRule::same_room(&name("/home")),
                move |_, ctx, _| {
                    assert_eq!(ctx.publisher.prefix(2), name("/home/bedroom"));
                    h.set(h.get() + 1);
                },
            )
            .unwrap();

        let room = PubSub::new(home.device("bedroom"));
        room.publish_command(&mut switch, ServiceId::LED, &name("/bedroom"), &Event::new("on", &b"1"[..]))
            .unwrap();
        pump(&mut switch, &mut light);
        assert_eq!(hits.get(), 1);

        // Wrong room.
        PubSub::new(home.device("kitchen"))
            .publish_command(&mut switch, ServiceId::LED, &name("/bedroom"), &Event::new("on", &b"1"[..]))
            .unwrap();
        pump(&mut switch, &mut light);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_digest_signed_command_claiming_anchor_rejected() {
        let home = Home::new();
        let mut light = home.forwarder();
        let mut rogue = home.forwarder();
        link(&mut light, &mut rogue);

        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let light_ps = PubSub::new(home.device("light"));
        light_ps
            .subscribe_to_command(&mut light, ServiceId::LED, &Name::new(), move |_, _, _| h.set(h.get() + 1))
            .unwrap();

        // Anyone can compute a digest, so naming the anchor key proves nothing.
        let command_name = light_ps
            .command_name(ServiceId::LED, &Name::new(), "on", now_ms())
            .unwrap();
        let mut forged = Data::new(command_name.clone(), &b"1"[..]);
        forged.encode_digest_sign();
        forged.signature.info.key_locator = Some(home.anchor_cert.name.clone());
        forged.signature.value = Bytes::copy_from_slice(&sha256(&forged.signed_portion()));
        assert!(forged.verify_digest());

        let params = encode_elements(&[TlvElement::new(TLV_PS_COMMAND, forged.encode())]);
        let interest = Interest::new(command_name).with_parameters(params);
        assert!(matches!(
            light_ps.accept_command(&light, ServiceId::LED, &interest),
            Err(Error::VerificationFailure(_))
        ));

        rogue.express_interest(interest, |_, _| {}, |_, _| {}).unwrap();
        pump(&mut rogue, &mut light);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_room_rule_stays_with_its_subscription() {
        let home = Home::new();
        let mut light = home.forwarder();
        let mut device = home.forwarder();
        let mut ctrl = home.forwarder();
        link(&mut light, &mut device);
        link(&mut light, &mut ctrl);

        let light_ps = PubSub::new(home.device("light"));
        light_ps
            .subscribe_to_command_with_rule(
                &mut light,
                ServiceId::LED,
                &name("/bedroom"),
                TrustSchemaRule::same_room(&name("/home")),
                |_, _, _| {},
            )
            .unwrap();
        let publishers = Rc::new(RefCell::new(Vec::new()));
        let p = Rc::clone(&publishers);
        light_ps
            .subscribe_to_command(&mut light, ServiceId::TEMP, &Name::new(), move |_, ctx, _| {
                p.borrow_mut().push(ctx.publisher.clone())
            })
            .unwrap();
        assert_eq!(light_ps.schema().len(), 1);

        // The device id matches the data-id, which a leaked room rule would
        // read as the room.
        PubSub::new(home.device("set"))
            .publish_command(&mut device, ServiceId::TEMP, &Name::new(), &Event::new("set", &b"18"[..]))
            .unwrap();
        pump(&mut device, &mut light);
        assert!(publishers.borrow().is_empty());

        PubSub::new(home.controller.clone())
            .publish_command(&mut ctrl, ServiceId::TEMP, &Name::new(), &Event::new("set", &b"21"[..]))
            .unwrap();
        pump(&mut ctrl, &mut light);
        assert_eq!(*publishers.borrow(), vec![home.anchor_cert.name.clone()]);
    }

    #[test]
    fn test_content_publish_and_subscribe() {
        let home = Home::new();
        let sensor_identity = home.device("sensor");
        let mut sensor = home.forwarder();
        let mut app = home.forwarder();
        link(&mut sensor, &mut app);
        app.keys_mut().install_certificate(sensor_identity.certificate()).unwrap();

        let sensor_ps = PubSub::new(sensor_identity);
        sensor_ps
            .publish_content(&mut sensor, ServiceId::TEMP, &Event::new("celsius", &b"21"[..]))
            .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        PubSub::new(home.device("app"))
            .subscribe_to_content(
                &mut app,
                ServiceId::TEMP,
                "sensor",
                "celsius",
                Duration::from_secs(1),
                move |_, event| s.borrow_mut().push(event.payload.clone()),
            )
            .unwrap();
        pump(&mut app, &mut sensor);
        assert_eq!(*seen.borrow(), vec![Bytes::from_static(b"21")]);
    }

    #[test]
    fn test_unknown_content_not_answered() {
        let home = Home::new();
        let mut fwd = home.forwarder();
        let ps = PubSub::new(home.device("sensor"));
        ps.publish_content(&mut fwd, ServiceId::TEMP, &Event::new("celsius", &b"21"[..]))
            .unwrap();

        let answered = Rc::new(Cell::new(false));
        let a = Rc::clone(&answered);
        let missing = ps.content_name(ServiceId::TEMP, "sensor", "humidity").unwrap();
        fwd.express_interest(Interest::new(missing), move |_, _| a.set(true), |_, _| {})
            .unwrap();
        assert!(!answered.get());

        let found = Rc::new(Cell::new(false));
        let f = Rc::clone(&found);
        let present = ps.content_name(ServiceId::TEMP, "sensor", "celsius").unwrap();
        fwd.express_interest(Interest::new(present), move |_, _| f.set(true), |_, _| {})
            .unwrap();
        assert!(found.get());
    }
}
