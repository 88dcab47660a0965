//! The incremental RFB protocol engine.
//!
//! [`Engine`] is a sans-IO state machine. The session feeds it raw socket
//! chunks through [`Engine::on_data`]; the engine accumulates them in a
//! [`Reassembler`], and every connection state declares exactly how many
//! bytes it needs next. When a block completes, the current state's handler
//! consumes it, applies draw primitives to the caller's
//! [`Surface`], appends any reply bytes to the outbound buffer, and
//! installs the next (state, demand) pair. Handlers return their successor
//! instead of re-entering delivery, so a single inbound chunk can drive any
//! number of transitions without recursion.
//!
//! The observable behaviour is therefore identical for any chunking of the
//! same byte stream - the property the whole capture pipeline leans on.
//!
//! State flow, roughly:
//!
//! ```text
//! AwaitingVersion
//!   v3.3 -> AwaitingSecurityType ---\
//!   v3.7+ -> AwaitingSecurityCount -> AwaitingSecurityList
//!                                       | None        | VNC auth
//!                                       v             v
//!                                  (AuthResult) <- AwaitingVncChallenge
//!                                       v
//!                     AwaitingServerInit -> AwaitingServerName
//!                                       v
//!                              AwaitingMessage <-------------+
//!                                v message type 0            |
//!                              AwaitingUpdateHeader          |
//!                                v                           |
//!                              AwaitingRectHeader -> Decoding(..)
//!                                       +--- commit_update --+
//! ```
//!
//! Errors close the connection: the engine drops into `Closed` and the
//! session tears the socket down. Partial blocks simply stay buffered.

use crate::errors::RfbError;
use bytes::{Bytes, BytesMut};
use rfb_common::Rect;
use rfb_encodings::{copyrect, cursor, hextile, raw, rre, zrle, DecodeState, Step, ZrleStream};
use rfb_protocol::messages::server::{cut_text_len, ServerInitHead};
use rfb_protocol::messages::types::{
    ENCODING_CORRE, ENCODING_COPY_RECT, ENCODING_HEXTILE, ENCODING_RAW, ENCODING_RRE,
    ENCODING_ZRLE, PSEUDO_ENCODING_CURSOR, PSEUDO_ENCODING_DESKTOP_SIZE,
    SECURITY_TYPE_NONE, SECURITY_TYPE_VNC_AUTH, SERVER_MSG_BELL, SERVER_MSG_CUT_TEXT,
    SERVER_MSG_FRAMEBUFFER_UPDATE,
};
use rfb_protocol::messages::{
    ClientCutText, ClientInit, FramebufferUpdateRequest, KeyEvent, PointerEvent, SetEncodings,
    SetPixelFormat,
};
use rfb_protocol::{auth, PixelFormat, Reassembler, Rectangle};
use rfb_pixelbuffer::Surface;

/// Negotiated protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Version {
    V3_3,
    V3_7,
    V3_8,
}

impl Version {
    fn greeting(self) -> &'static [u8; 12] {
        match self {
            Version::V3_3 => b"RFB 003.003\n",
            Version::V3_7 => b"RFB 003.007\n",
            Version::V3_8 => b"RFB 003.008\n",
        }
    }
}

/// Which failure a pending reason string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    /// The server refused the connection outright.
    Refused,
    /// Authentication failed.
    AuthFailed,
    /// Too many authentication attempts.
    TooManyTries,
}

/// Connection state. Transitions are driven exclusively by the reassembler
/// satisfying the current state's byte demand.
#[derive(Debug)]
enum State {
    AwaitingVersion,
    /// RFB 3.3: the server dictates one security type as a 4-byte word.
    AwaitingSecurityType,
    AwaitingSecurityCount,
    AwaitingSecurityList,
    AwaitingVncChallenge,
    AwaitingAuthResult,
    /// 4-byte length of a failure reason string.
    AwaitingReasonLength(FailureKind),
    AwaitingReason(FailureKind),
    AwaitingServerInit,
    AwaitingServerName(ServerInitHead),
    AwaitingMessage,
    /// FramebufferUpdate header: padding + rectangle count.
    AwaitingUpdateHeader,
    AwaitingRectHeader,
    Decoding(DecodeState),
    /// ServerCutText header: 3 padding bytes + text length.
    AwaitingCutTextHeader,
    AwaitingCutText,
    Closed,
}

/// Options for a new engine.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Password for VNC authentication, if the server demands it.
    pub password: Option<String>,
    /// Request a shared session (other clients stay connected).
    pub shared: bool,
}

/// The incremental protocol state machine for one connection.
///
/// Owns the reassembler, the outbound byte queue, the negotiated pixel
/// format and the connection-lifetime ZRLE zlib stream. Create one per
/// connection; on reconnect, create a new one.
pub struct Engine {
    reassembler: Reassembler,
    state: State,
    out: BytesMut,
    options: EngineOptions,
    version: Version,
    pixel_format: PixelFormat,
    width: u16,
    height: u16,
    name: String,
    zlib: ZrleStream,
    rects_remaining: u16,
    update_rects: Vec<Rect>,
    ready: bool,
    just_ready: bool,
}

impl Engine {
    /// Create an engine awaiting the server's version greeting.
    pub fn new(options: EngineOptions) -> Self {
        let mut reassembler = Reassembler::new();
        reassembler.expect(12); // "RFB xxx.yyy\n"
        Self {
            reassembler,
            state: State::AwaitingVersion,
            out: BytesMut::new(),
            options,
            version: Version::V3_8,
            pixel_format: PixelFormat::rgbx(),
            width: 0,
            height: 0,
            name: String::new(),
            zlib: ZrleStream::new(),
            rects_remaining: 0,
            update_rects: Vec::new(),
            ready: false,
            just_ready: false,
        }
    }

    /// Feed a chunk of socket bytes, dispatching every block it completes.
    ///
    /// On error the connection is closed; the caller must not feed further
    /// data.
    pub fn on_data(&mut self, chunk: &[u8], surface: &mut dyn Surface) -> Result<(), RfbError> {
        if matches!(self.state, State::Closed) {
            return Err(RfbError::MalformedMessage {
                context: "stream",
                detail: "data received after close".into(),
            });
        }
        self.reassembler.push(chunk);
        while let Some(block) = self.reassembler.take_block() {
            if let Err(error) = self.handle_block(block, surface) {
                self.state = State::Closed;
                return Err(error);
            }
        }
        Ok(())
    }

    /// Drain bytes queued for the server.
    pub fn take_outbound(&mut self) -> Bytes {
        self.out.split().freeze()
    }

    /// Whether there are bytes queued for the server.
    pub fn has_outbound(&self) -> bool {
        !self.out.is_empty()
    }

    /// True once the handshake has completed.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Latched ready signal: true exactly once, when the handshake has just
    /// completed. The session uses this to send its initial messages.
    pub fn poll_ready(&mut self) -> bool {
        std::mem::take(&mut self.just_ready)
    }

    /// Negotiated protocol version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Current pixel format updates are decoded under.
    pub fn pixel_format(&self) -> &PixelFormat {
        &self.pixel_format
    }

    /// Desktop size from ServerInit (and later desktop-size updates).
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Desktop name from ServerInit.
    pub fn name(&self) -> &str {
        &self.name
    }

    //
    // Client -> server messages
    //

    /// Tell the server to send updates in `format` and decode under it from
    /// now on.
    pub fn send_set_pixel_format(&mut self, format: PixelFormat) {
        SetPixelFormat {
            pixel_format: format,
        }
        .write_to(&mut self.out);
        self.pixel_format = format;
    }

    /// Declare supported encodings in preference order.
    pub fn send_set_encodings(&mut self, encodings: &[i32]) {
        SetEncodings {
            encodings: encodings.to_vec(),
        }
        .write_to(&mut self.out);
    }

    /// Request the next update for the whole desktop.
    pub fn send_framebuffer_update_request(&mut self, incremental: bool) {
        FramebufferUpdateRequest {
            incremental,
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
        .write_to(&mut self.out);
    }

    /// Send a key press or release.
    pub fn send_key_event(&mut self, key: u32, down: bool) {
        KeyEvent { down, key }.write_to(&mut self.out);
    }

    /// Send a pointer position / button state.
    pub fn send_pointer_event(&mut self, x: u16, y: u16, button_mask: u8) {
        PointerEvent { button_mask, x, y }.write_to(&mut self.out);
    }

    /// Publish clipboard text to the server.
    pub fn send_cut_text(&mut self, text: &str) {
        ClientCutText {
            text: text.to_string(),
        }
        .write_to(&mut self.out);
    }

    //
    // State handlers
    //

    /// Install the next state and its byte demand.
    fn expect(&mut self, state: State, n: usize) {
        self.state = state;
        self.reassembler.expect(n);
    }

    fn handle_block(&mut self, block: Bytes, surface: &mut dyn Surface) -> Result<(), RfbError> {
        let state = std::mem::replace(&mut self.state, State::Closed);
        match state {
            State::AwaitingVersion => self.handle_version(&block),
            State::AwaitingSecurityType => self.handle_security_type(&block),
            State::AwaitingSecurityCount => self.handle_security_count(&block),
            State::AwaitingSecurityList => self.handle_security_list(&block),
            State::AwaitingVncChallenge => self.handle_vnc_challenge(&block),
            State::AwaitingAuthResult => self.handle_auth_result(&block),
            State::AwaitingReasonLength(kind) => self.handle_reason_length(&block, kind),
            State::AwaitingReason(kind) => self.handle_reason(&block, kind),
            State::AwaitingServerInit => self.handle_server_init(&block, surface),
            State::AwaitingServerName(head) => self.handle_server_name(&block, head, surface),
            State::AwaitingMessage => self.handle_message_type(&block, surface),
            State::AwaitingUpdateHeader => self.handle_update_header(&block, surface),
            State::AwaitingRectHeader => self.handle_rect_header(&block, surface),
            State::Decoding(decode) => self.handle_decode(decode, &block, surface),
            State::AwaitingCutTextHeader => self.handle_cut_text_header(&block),
            State::AwaitingCutText => self.handle_cut_text(&block, surface),
            State::Closed => unreachable!("no blocks are delivered after close"),
        }
    }

    fn handle_version(&mut self, block: &[u8]) -> Result<(), RfbError> {
        let greeting = String::from_utf8_lossy(block);
        if &block[..4] != b"RFB " || block[7] != b'.' || block[11] != b'\n' {
            return Err(RfbError::MalformedMessage {
                context: "version greeting",
                detail: format!("{:?}", greeting),
            });
        }
        let parse = |digits: &[u8]| -> Option<u32> {
            std::str::from_utf8(digits).ok()?.parse().ok()
        };
        let (major, minor) = match (parse(&block[4..7]), parse(&block[8..11])) {
            (Some(major), Some(minor)) => (major, minor),
            _ => {
                return Err(RfbError::MalformedMessage {
                    context: "version greeting",
                    detail: format!("{:?}", greeting),
                })
            }
        };

        // Highest version we support without exceeding the server's.
        self.version = if major > 3 || (major == 3 && minor >= 8) {
            Version::V3_8
        } else if major == 3 && minor == 7 {
            Version::V3_7
        } else if major == 3 && minor >= 3 {
            Version::V3_3
        } else {
            return Err(RfbError::ProtocolVersion(format!("{}.{}", major, minor)));
        };
        tracing::info!("server speaks RFB {}.{}, using {:?}", major, minor, self.version);

        self.out.extend_from_slice(self.version.greeting());
        if self.version == Version::V3_3 {
            self.expect(State::AwaitingSecurityType, 4);
        } else {
            self.expect(State::AwaitingSecurityCount, 1);
        }
        Ok(())
    }

    fn handle_security_type(&mut self, block: &[u8]) -> Result<(), RfbError> {
        let security = u32::from_be_bytes([block[0], block[1], block[2], block[3]]);
        match security {
            0 => {
                self.expect(State::AwaitingReasonLength(FailureKind::Refused), 4);
                Ok(())
            }
            1 => self.send_client_init(),
            2 => {
                self.expect(State::AwaitingVncChallenge, 16);
                Ok(())
            }
            other => Err(RfbError::UnknownSecurityType(other)),
        }
    }

    fn handle_security_count(&mut self, block: &[u8]) -> Result<(), RfbError> {
        let count = block[0];
        if count == 0 {
            self.expect(State::AwaitingReasonLength(FailureKind::Refused), 4);
        } else {
            self.expect(State::AwaitingSecurityList, count as usize);
        }
        Ok(())
    }

    fn handle_security_list(&mut self, block: &[u8]) -> Result<(), RfbError> {
        let chosen = block
            .iter()
            .copied()
            .filter(|&t| t == SECURITY_TYPE_NONE || t == SECURITY_TYPE_VNC_AUTH)
            .max()
            .ok_or_else(|| RfbError::UnsupportedSecurity(block.to_vec()))?;

        self.out.extend_from_slice(&[chosen]);
        if chosen == SECURITY_TYPE_VNC_AUTH {
            self.expect(State::AwaitingVncChallenge, 16);
        } else if self.version == Version::V3_8 {
            // Even "None" is acknowledged with a security result at 3.8.
            self.expect(State::AwaitingAuthResult, 4);
        } else {
            self.send_client_init()?;
        }
        Ok(())
    }

    fn handle_vnc_challenge(&mut self, block: &[u8]) -> Result<(), RfbError> {
        let password = self.options.password.as_deref().ok_or_else(|| {
            RfbError::AuthFailed("server requires a password but none is configured".into())
        })?;
        let mut challenge = [0u8; 16];
        challenge.copy_from_slice(block);
        let response = auth::challenge_response(password, &challenge);
        self.out.extend_from_slice(&response);
        self.expect(State::AwaitingAuthResult, 4);
        Ok(())
    }

    fn handle_auth_result(&mut self, block: &[u8]) -> Result<(), RfbError> {
        let result = u32::from_be_bytes([block[0], block[1], block[2], block[3]]);
        match result {
            0 => self.send_client_init(),
            1 => {
                if self.version == Version::V3_8 {
                    self.expect(State::AwaitingReasonLength(FailureKind::AuthFailed), 4);
                    Ok(())
                } else {
                    Err(RfbError::AuthFailed("authentication failed".into()))
                }
            }
            2 => {
                if self.version == Version::V3_8 {
                    self.expect(State::AwaitingReasonLength(FailureKind::TooManyTries), 4);
                    Ok(())
                } else {
                    Err(RfbError::AuthTooManyTries)
                }
            }
            other => Err(RfbError::MalformedMessage {
                context: "security result",
                detail: format!("unknown value {}", other),
            }),
        }
    }

    fn handle_reason_length(&mut self, block: &[u8], kind: FailureKind) -> Result<(), RfbError> {
        let length = u32::from_be_bytes([block[0], block[1], block[2], block[3]]);
        if length == 0 {
            return Err(failure_error(kind, String::new()));
        }
        self.expect(State::AwaitingReason(kind), length as usize);
        Ok(())
    }

    fn handle_reason(&mut self, block: &[u8], kind: FailureKind) -> Result<(), RfbError> {
        let reason = String::from_utf8_lossy(block).to_string();
        Err(failure_error(kind, reason))
    }

    fn send_client_init(&mut self) -> Result<(), RfbError> {
        ClientInit {
            shared: self.options.shared,
        }
        .write_to(&mut self.out);
        self.expect(State::AwaitingServerInit, 24);
        Ok(())
    }

    fn handle_server_init(
        &mut self,
        block: &[u8],
        surface: &mut dyn Surface,
    ) -> Result<(), RfbError> {
        let head = ServerInitHead::from_wire(block).map_err(|e| RfbError::MalformedMessage {
            context: "ServerInit",
            detail: e.to_string(),
        })?;
        if head.name_len == 0 {
            self.finish_init(head, String::new(), surface);
            return Ok(());
        }
        let name_len = head.name_len as usize;
        self.expect(State::AwaitingServerName(head), name_len);
        Ok(())
    }

    fn handle_server_name(
        &mut self,
        block: &[u8],
        head: ServerInitHead,
        surface: &mut dyn Surface,
    ) -> Result<(), RfbError> {
        let name = String::from_utf8_lossy(block).to_string();
        self.finish_init(head, name, surface);
        Ok(())
    }

    fn finish_init(&mut self, head: ServerInitHead, name: String, surface: &mut dyn Surface) {
        self.width = head.width;
        self.height = head.height;
        self.pixel_format = head.pixel_format;
        self.name = name;
        self.ready = true;
        self.just_ready = true;

        tracing::info!(
            "connected to {:?}: {}x{}, {} bpp, {:?}",
            self.name,
            self.width,
            self.height,
            self.pixel_format.bits_per_pixel,
            self.pixel_format.channel_order(),
        );

        // Size the canvas before the first update arrives.
        surface.resize_desktop(self.width, self.height);
        self.expect(State::AwaitingMessage, 1);
    }

    //
    // Server messages
    //

    fn handle_message_type(
        &mut self,
        block: &[u8],
        surface: &mut dyn Surface,
    ) -> Result<(), RfbError> {
        match block[0] {
            SERVER_MSG_FRAMEBUFFER_UPDATE => self.expect(State::AwaitingUpdateHeader, 3),
            SERVER_MSG_BELL => {
                surface.bell();
                self.expect(State::AwaitingMessage, 1);
            }
            SERVER_MSG_CUT_TEXT => self.expect(State::AwaitingCutTextHeader, 7),
            other => {
                tracing::warn!("unknown server message type {}", other);
                self.expect(State::AwaitingMessage, 1);
            }
        }
        Ok(())
    }

    fn handle_update_header(
        &mut self,
        block: &[u8],
        surface: &mut dyn Surface,
    ) -> Result<(), RfbError> {
        // 1 padding byte, then the rectangle count.
        self.rects_remaining = u16::from_be_bytes([block[1], block[2]]);
        self.update_rects.clear();
        surface.begin_update();

        if self.rects_remaining == 0 {
            surface.commit_update(&[]);
            self.expect(State::AwaitingMessage, 1);
        } else {
            self.expect(State::AwaitingRectHeader, 12);
        }
        Ok(())
    }

    fn handle_rect_header(
        &mut self,
        block: &[u8],
        surface: &mut dyn Surface,
    ) -> Result<(), RfbError> {
        let rect = Rectangle::from_wire(block).map_err(|e| RfbError::MalformedMessage {
            context: "rectangle header",
            detail: e.to_string(),
        })?;
        self.rects_remaining -= 1;
        self.update_rects.push(Rect::new(
            rect.x as i32,
            rect.y as i32,
            rect.width as u32,
            rect.height as u32,
        ));

        tracing::debug!(
            "rect [{},{} {}x{}] encoding {}",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            rect.encoding
        );

        match rect.encoding {
            ENCODING_RAW => {
                if rect.is_empty() {
                    self.next_rectangle(surface)
                } else {
                    self.install(raw::begin(rect, &self.pixel_format), surface)
                }
            }
            ENCODING_COPY_RECT => self.install(copyrect::begin(rect), surface),
            ENCODING_RRE => self.install(rre::begin_rre(rect, &self.pixel_format), surface),
            ENCODING_CORRE => self.install(rre::begin_corre(rect, &self.pixel_format), surface),
            ENCODING_HEXTILE => {
                if rect.is_empty() {
                    self.next_rectangle(surface)
                } else {
                    self.install(hextile::begin(rect), surface)
                }
            }
            ENCODING_ZRLE => self.install(zrle::begin(rect), surface),
            PSEUDO_ENCODING_CURSOR => {
                if cursor::payload_len(&rect, &self.pixel_format) == 0 {
                    surface.update_cursor(None);
                    self.next_rectangle(surface)
                } else {
                    self.install(cursor::begin(rect, &self.pixel_format), surface)
                }
            }
            PSEUDO_ENCODING_DESKTOP_SIZE => {
                self.width = rect.width;
                self.height = rect.height;
                surface.resize_desktop(rect.width, rect.height);
                self.next_rectangle(surface)
            }
            other => {
                // The server sent no payload for an encoding we did not
                // advertise; skip to the next rectangle.
                tracing::warn!("unknown encoding {} - skipping rectangle", other);
                self.next_rectangle(surface)
            }
        }
    }

    fn handle_decode(
        &mut self,
        decode: DecodeState,
        block: &[u8],
        surface: &mut dyn Surface,
    ) -> Result<(), RfbError> {
        let step = decode.step(block, &self.pixel_format, &mut self.zlib, surface)?;
        self.install(step, surface)
    }

    fn install(&mut self, step: Step, surface: &mut dyn Surface) -> Result<(), RfbError> {
        match step {
            Step::Read(n, state) => {
                self.expect(State::Decoding(state), n);
                Ok(())
            }
            Step::Done => self.next_rectangle(surface),
        }
    }

    fn next_rectangle(&mut self, surface: &mut dyn Surface) -> Result<(), RfbError> {
        if self.rects_remaining > 0 {
            self.expect(State::AwaitingRectHeader, 12);
        } else {
            surface.commit_update(&self.update_rects);
            self.update_rects.clear();
            self.expect(State::AwaitingMessage, 1);
        }
        Ok(())
    }

    fn handle_cut_text_header(&mut self, block: &[u8]) -> Result<(), RfbError> {
        let length = cut_text_len(block).map_err(|e| RfbError::MalformedMessage {
            context: "ServerCutText",
            detail: e.to_string(),
        })?;
        if length == 0 {
            self.expect(State::AwaitingMessage, 1);
        } else {
            self.expect(State::AwaitingCutText, length as usize);
        }
        Ok(())
    }

    fn handle_cut_text(&mut self, block: &[u8], surface: &mut dyn Surface) -> Result<(), RfbError> {
        surface.cut_text(String::from_utf8_lossy(block).to_string());
        self.expect(State::AwaitingMessage, 1);
        Ok(())
    }
}

fn failure_error(kind: FailureKind, reason: String) -> RfbError {
    match kind {
        FailureKind::Refused => RfbError::ConnectionRefused(reason),
        FailureKind::AuthFailed => RfbError::AuthFailed(reason),
        FailureKind::TooManyTries => {
            if !reason.is_empty() {
                tracing::warn!("server refused further auth attempts: {}", reason);
            }
            RfbError::AuthTooManyTries
        }
    }
}
