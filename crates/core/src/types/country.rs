//! Supported countries and their local payment methods.
//!
//! GOMs pick one country per order; buyers can only pay with a method the
//! order accepts, and an order can only accept methods available in its
//! country.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error for unsupported countries or payment methods.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CountryError {
    /// Country code not in the supported list.
    #[error("unsupported country: {0}")]
    Unsupported(String),
    /// Payment method not offered in the country.
    #[error("payment method {method} is not available in {country}")]
    UnknownPaymentMethod {
        /// Country code.
        country: Country,
        /// Rejected method id.
        method: String,
    },
}

/// How a payment method moves money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Ewallet,
    Bank,
    Qr,
    Fps,
    Venmo,
    Zelle,
    Paypal,
    Interac,
    Payid,
}

/// A payment method offered in a country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaymentMethod {
    /// Stable identifier stored on orders and submissions.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Method kind.
    pub kind: PaymentMethodKind,
}

const fn method(id: &'static str, name: &'static str, kind: PaymentMethodKind) -> PaymentMethod {
    PaymentMethod { id, name, kind }
}

const BANK_TRANSFER: PaymentMethod = method("bank_transfer", "Bank Transfer", PaymentMethodKind::Bank);
const PAYPAL: PaymentMethod = method("paypal", "PayPal", PaymentMethodKind::Paypal);

const PH_METHODS: &[PaymentMethod] = &[
    method("gcash", "GCash", PaymentMethodKind::Ewallet),
    BANK_TRANSFER,
];
const MY_METHODS: &[PaymentMethod] = &[
    BANK_TRANSFER,
    method("touch_n_go", "Touch n Go", PaymentMethodKind::Ewallet),
];
const ID_METHODS: &[PaymentMethod] = &[
    BANK_TRANSFER,
    method("gopay", "GoPay", PaymentMethodKind::Ewallet),
];
const TH_METHODS: &[PaymentMethod] = &[
    BANK_TRANSFER,
    method("promptpay", "PromptPay", PaymentMethodKind::Qr),
];
const SG_METHODS: &[PaymentMethod] = &[
    method("paynow", "PayNow", PaymentMethodKind::Qr),
    BANK_TRANSFER,
];
const HK_METHODS: &[PaymentMethod] = &[
    method("fps", "FPS", PaymentMethodKind::Fps),
    method("payme", "PayMe", PaymentMethodKind::Ewallet),
    BANK_TRANSFER,
];
const US_METHODS: &[PaymentMethod] = &[
    method("venmo", "Venmo", PaymentMethodKind::Venmo),
    method("zelle", "Zelle", PaymentMethodKind::Zelle),
    PAYPAL,
];
const CA_METHODS: &[PaymentMethod] = &[
    method("interac", "Interac e-Transfer", PaymentMethodKind::Interac),
    PAYPAL,
];
const GB_METHODS: &[PaymentMethod] = &[BANK_TRANSFER, PAYPAL];
const AU_METHODS: &[PaymentMethod] = &[
    method("payid", "PayID", PaymentMethodKind::Payid),
    BANK_TRANSFER,
];

/// Countries where GOMFLOW runs group orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Country {
    Ph,
    My,
    Id,
    Th,
    Sg,
    Hk,
    Us,
    Ca,
    Gb,
    Au,
}

impl Country {
    /// Every supported country in display order.
    pub const ALL: [Self; 10] = [
        Self::Ph,
        Self::My,
        Self::Id,
        Self::Th,
        Self::Sg,
        Self::Hk,
        Self::Us,
        Self::Ca,
        Self::Gb,
        Self::Au,
    ];

    /// ISO 3166-1 alpha-2 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ph => "PH",
            Self::My => "MY",
            Self::Id => "ID",
            Self::Th => "TH",
            Self::Sg => "SG",
            Self::Hk => "HK",
            Self::Us => "US",
            Self::Ca => "CA",
            Self::Gb => "GB",
            Self::Au => "AU",
        }
    }

    /// English display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ph => "Philippines",
            Self::My => "Malaysia",
            Self::Id => "Indonesia",
            Self::Th => "Thailand",
            Self::Sg => "Singapore",
            Self::Hk => "Hong Kong",
            Self::Us => "United States",
            Self::Ca => "Canada",
            Self::Gb => "United Kingdom",
            Self::Au => "Australia",
        }
    }

    /// Payment methods buyers in this country commonly use.
    #[must_use]
    pub const fn payment_methods(self) -> &'static [PaymentMethod] {
        match self {
            Self::Ph => PH_METHODS,
            Self::My => MY_METHODS,
            Self::Id => ID_METHODS,
            Self::Th => TH_METHODS,
            Self::Sg => SG_METHODS,
            Self::Hk => HK_METHODS,
            Self::Us => US_METHODS,
            Self::Ca => CA_METHODS,
            Self::Gb => GB_METHODS,
            Self::Au => AU_METHODS,
        }
    }

    /// Largest local banks, offered as suggestions for bank-transfer details.
    #[must_use]
    pub const fn top_banks(self) -> &'static [&'static str] {
        match self {
            Self::Ph => &["BDO", "BPI", "Metrobank", "UnionBank"],
            Self::My => &["Maybank", "CIMB", "Public Bank", "RHB"],
            Self::Id => &["BCA", "Mandiri", "BNI", "BRI"],
            Self::Th => &["Bangkok Bank", "Kasikorn", "SCB"],
            Self::Sg => &["DBS/POSB", "OCBC", "UOB"],
            Self::Hk => &["HSBC", "Bank of China", "Standard Chartered"],
            Self::Us => &["Chase", "Bank of America", "Wells Fargo"],
            Self::Ca => &["TD", "RBC", "BMO", "Scotiabank"],
            Self::Gb => &["HSBC", "Barclays", "Lloyds", "NatWest"],
            Self::Au => &["Commonwealth", "ANZ", "Westpac", "NAB"],
        }
    }

    /// Look up one of this country's payment methods by id.
    ///
    /// # Errors
    ///
    /// Returns `CountryError::UnknownPaymentMethod` if the id is not offered here.
    pub fn payment_method(self, id: &str) -> Result<&'static PaymentMethod, CountryError> {
        self.payment_methods()
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| CountryError::UnknownPaymentMethod {
                country: self,
                method: id.to_owned(),
            })
    }

    /// Parse an alpha-2 code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `CountryError::Unsupported` for any other input.
    pub fn parse(s: &str) -> Result<Self, CountryError> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| CountryError::Unsupported(s.to_owned()))
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Country {
    type Err = CountryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Country {
    type Error = CountryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Country> for &'static str {
    fn from(country: Country) -> Self {
        country.code()
    }
}
