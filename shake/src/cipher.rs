use core::fmt::{self, Display, Formatter};

/// TLS cipher suite the handshake is restricted to.
///
/// The table is closed: only the suites listed in [`CipherSuite::ALL`] can be
/// selected, which keeps the negotiated parameters comparable between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuite {
    /// IANA name.
    name: &'static str,
    /// IANA identifier.
    id: u16,
    /// OpenSSL cipher string, `None` for signalling pseudo-suites.
    openssl: Option<&'static str>,
}

impl CipherSuite {
    pub const TLS_RSA_WITH_RC4_128_SHA: Self = Self::new("TLS_RSA_WITH_RC4_128_SHA", 0x0005, "RC4-SHA");
    pub const TLS_RSA_WITH_3DES_EDE_CBC_SHA: Self =
        Self::new("TLS_RSA_WITH_3DES_EDE_CBC_SHA", 0x000a, "DES-CBC3-SHA");
    pub const TLS_RSA_WITH_AES_128_CBC_SHA: Self = Self::new("TLS_RSA_WITH_AES_128_CBC_SHA", 0x002f, "AES128-SHA");
    pub const TLS_RSA_WITH_AES_256_CBC_SHA: Self = Self::new("TLS_RSA_WITH_AES_256_CBC_SHA", 0x0035, "AES256-SHA");
    pub const TLS_ECDHE_ECDSA_WITH_RC4_128_SHA: Self =
        Self::new("TLS_ECDHE_ECDSA_WITH_RC4_128_SHA", 0xc007, "ECDHE-ECDSA-RC4-SHA");
    pub const TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA: Self =
        Self::new("TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA", 0xc009, "ECDHE-ECDSA-AES128-SHA");
    pub const TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA: Self =
        Self::new("TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA", 0xc00a, "ECDHE-ECDSA-AES256-SHA");
    pub const TLS_ECDHE_RSA_WITH_RC4_128_SHA: Self =
        Self::new("TLS_ECDHE_RSA_WITH_RC4_128_SHA", 0xc011, "ECDHE-RSA-RC4-SHA");
    pub const TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA: Self =
        Self::new("TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA", 0xc012, "ECDHE-RSA-DES-CBC3-SHA");
    pub const TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA: Self =
        Self::new("TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA", 0xc013, "ECDHE-RSA-AES128-SHA");
    pub const TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA: Self =
        Self::new("TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA", 0xc014, "ECDHE-RSA-AES256-SHA");
    pub const TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256: Self =
        Self::new("TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256", 0xc02f, "ECDHE-RSA-AES128-GCM-SHA256");
    pub const TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256: Self =
        Self::new("TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256", 0xc02b, "ECDHE-ECDSA-AES128-GCM-SHA256");
    /// Not a cipher suite, but an indicator that the client is doing a
    /// protocol version fallback (RFC 7507).
    pub const TLS_FALLBACK_SCSV: Self = Self {
        name: "TLS_FALLBACK_SCSV",
        id: 0x5600,
        openssl: None,
    };

    /// All supported suites.
    pub const ALL: &'static [Self] = &[
        Self::TLS_RSA_WITH_RC4_128_SHA,
        Self::TLS_RSA_WITH_3DES_EDE_CBC_SHA,
        Self::TLS_RSA_WITH_AES_128_CBC_SHA,
        Self::TLS_RSA_WITH_AES_256_CBC_SHA,
        Self::TLS_ECDHE_ECDSA_WITH_RC4_128_SHA,
        Self::TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA,
        Self::TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA,
        Self::TLS_ECDHE_RSA_WITH_RC4_128_SHA,
        Self::TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA,
        Self::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA,
        Self::TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA,
        Self::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        Self::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        Self::TLS_FALLBACK_SCSV,
    ];

    const fn new(name: &'static str, id: u16, openssl: &'static str) -> Self {
        Self { name, id, openssl: Some(openssl) }
    }

    /// Looks up a suite by its IANA name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.name == name)
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub const fn id(&self) -> u16 {
        self.id
    }

    /// Returns `true` for the fallback signalling pseudo-suite.
    #[inline]
    pub const fn is_signalling(&self) -> bool {
        self.openssl.is_none()
    }
}

impl Display for CipherSuite {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), fmt::Error> {
        write!(fmt, "{} (0x{:04x})", self.name(), self.id())
    }
}

/// Builds an OpenSSL cipher list out of the given suites.
///
/// Signalling pseudo-suites are skipped. The security level is lowered to
/// zero, otherwise modern OpenSSL refuses to offer legacy suites at all.
pub fn openssl_cipher_list(suites: &[CipherSuite]) -> String {
    let mut list: Vec<&str> = suites.iter().filter_map(|v| v.openssl).collect();
    list.dedup();
    list.push("@SECLEVEL=0");

    list.join(":")
}
