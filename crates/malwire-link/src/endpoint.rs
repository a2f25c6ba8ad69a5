use malwire_codec::{Element, ElementCodec, ElementKind, WireCodec};
use malwire_transport::{QosProperties, Transport};

use crate::error::Result;

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedElements {
    pub source: String,
    pub elements: Vec<Element>,
    pub properties: QosProperties,
}

/// Pairs a transport with the element codec both peers agreed on.
#[derive(Debug)]
pub struct MessageEndpoint<T> {
    transport: T,
    codec: WireCodec,
}

impl<T: Transport> MessageEndpoint<T> {
    pub fn new(transport: T, codec: impl Into<WireCodec>) -> Self {
        Self {
            transport,
            codec: codec.into(),
        }
    }

    /// Encode `elements` and send them as one message.
    pub fn send_elements(&self, elements: &[Element]) -> Result<()> {
        let bytes = self.codec.encode(elements)?;
        self.transport.send_encoded_message(&bytes)?;
        Ok(())
    }

    /// Receive the next message and decode it as `kinds`.
    ///
    /// A message that fails to decode is consumed and its error returned.
    pub fn receive_elements(&self, kinds: &[ElementKind]) -> Result<ReceivedElements> {
        let message = self.transport.receive()?;
        let elements = self.codec.decode(&message.body, kinds)?;
        Ok(ReceivedElements {
            source: message.source,
            elements,
            properties: message.properties,
        })
    }

    pub fn codec(&self) -> WireCodec {
        self.codec
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

#[cfg(all(test, unix))]
mod tests {
    use malwire_codec::{CodecError, CodecStrategy, Value};
    use malwire_transport::LinkStream;

    use super::*;
    use crate::config::SppConfig;
    use crate::error::LinkError;
    use crate::spp::SppTransport;

    fn endpoints(left: CodecStrategy, right: CodecStrategy) -> (
        MessageEndpoint<SppTransport>,
        MessageEndpoint<SppTransport>,
    ) {
        let (a, b) = LinkStream::pair().unwrap();
        (
            MessageEndpoint::new(SppTransport::from_stream(a, SppConfig::default()).unwrap(), left),
            MessageEndpoint::new(SppTransport::from_stream(b, SppConfig::default()).unwrap(), right),
        )
    }

    #[test]
    fn elements_cross_the_link() {
        let (a, b) = endpoints(CodecStrategy::Split, CodecStrategy::Split);
        let elements = vec![
            Some(Value::Boolean(true)),
            None,
            Some(Value::UShort(513)),
            Some(Value::String("telemetry".into())),
        ];
        a.send_elements(&elements).unwrap();

        let kinds = [
            ElementKind::Boolean,
            ElementKind::Integer,
            ElementKind::UShort,
            ElementKind::String,
        ];
        let received = b.receive_elements(&kinds).unwrap();
        assert_eq!(received.elements, elements);
        assert!(received.source.starts_with("malspp://"));
    }

    #[test]
    fn strategy_mismatch_surfaces_and_link_survives() {
        let (a, b) = endpoints(CodecStrategy::Plain, CodecStrategy::Split);
        a.send_elements(&[Some(Value::UOctet(1))]).unwrap();
        let err = b.receive_elements(&[ElementKind::UOctet]).unwrap_err();
        assert!(matches!(
            err,
            LinkError::Codec(CodecError::StrategyMismatch { .. })
        ));

        b.transport().send_encoded_message(b"raw").unwrap();
        assert_eq!(a.transport().receive().unwrap().body.as_ref(), b"raw");
    }
}
