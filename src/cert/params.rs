use bon::Builder;
use const_oid::ObjectIdentifier;
use der::{Tag, Tagged};
use der::asn1::{Any, PrintableStringRef, SetOfVec};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::{CertgenError, Result};

const COUNTRY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const STATE_OR_PROVINCE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const LOCALITY: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const ORGANIZATION: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const ORGANIZATIONAL_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Distinguished name parameters for building an X.509 certificate.
///
/// This struct represents the subject or issuer name in a certificate.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: String,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// Attributes are emitted in `C, ST, L, O, OU, CN` order. Absent or empty
    /// optional attributes are left out. The country is a `PrintableString`,
    /// everything else a `UTF8String`.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName> {
        let attributes = [
            (COUNTRY, self.country.as_deref()),
            (STATE_OR_PROVINCE, self.state.as_deref()),
            (LOCALITY, self.locality.as_deref()),
            (ORGANIZATION, self.organization.as_deref()),
            (ORGANIZATIONAL_UNIT, self.organization_unit.as_deref()),
            (COMMON_NAME, Some(self.common_name.as_str())),
        ];

        let mut rdns = Vec::new();
        for (oid, value) in attributes {
            let Some(value) = value.filter(|v| !v.is_empty()) else {
                continue;
            };
            let value = if oid == COUNTRY {
                PrintableStringRef::new(value).map_err(|_| {
                    CertgenError::InvalidInput(format!("country '{value}' is not printable"))
                })?;
                Any::new(Tag::PrintableString, value.as_bytes())?
            } else {
                Any::new(Tag::Utf8String, value.as_bytes())?
            };
            let attribute = AttributeTypeAndValue { oid, value };
            rdns.push(RelativeDistinguishedName(SetOfVec::try_from(vec![
                attribute,
            ])?));
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509-compatible format.
    ///
    /// Attributes other than the six above are ignored. When an attribute
    /// repeats, the last one wins.
    pub fn from_x509_name(x509dn: &x509_cert::name::DistinguishedName) -> Result<Self> {
        let mut name = DistinguishedName::default();

        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let slot = match attr.oid {
                    COMMON_NAME => {
                        name.common_name = directory_string(&attr.value)?;
                        continue;
                    }
                    COUNTRY => &mut name.country,
                    STATE_OR_PROVINCE => &mut name.state,
                    LOCALITY => &mut name.locality,
                    ORGANIZATION => &mut name.organization,
                    ORGANIZATIONAL_UNIT => &mut name.organization_unit,
                    _ => continue,
                };
                *slot = Some(directory_string(&attr.value)?);
            }
        }

        Ok(name)
    }
}

fn directory_string(value: &Any) -> Result<String> {
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
            std::str::from_utf8(value.value())
                .map(str::to_string)
                .map_err(|e| CertgenError::DecodingError(e.to_string()))
        }
        other => Err(CertgenError::DecodingError(format!(
            "unsupported name attribute encoding {other}"
        ))),
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

/// Last year an X.509 time value can carry.
pub const MAX_ENCODABLE_YEAR: i32 = 9999;

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    ///
    /// Both ends are truncated to whole seconds, the precision X.509 time
    /// values carry. Fails when the end would fall after
    /// [`MAX_ENCODABLE_YEAR`].
    pub fn for_days(days: u32) -> Result<Self> {
        Self::starting_at(OffsetDateTime::now_utc(), days)
    }

    pub fn starting_at(start: OffsetDateTime, days: u32) -> Result<Self> {
        let start = start - Duration::nanoseconds(i64::from(start.nanosecond()));
        let not_after = start
            .checked_add(Duration::days(i64::from(days)))
            .filter(|end| end.year() <= MAX_ENCODABLE_YEAR)
            .ok_or_else(|| {
                CertgenError::InvalidInput(format!(
                    "a validity of {days} days ends after the year {MAX_ENCODABLE_YEAR}"
                ))
            })?;
        Ok(Self {
            not_before: start,
            not_after,
        })
    }

    pub fn days(&self) -> i64 {
        (self.not_after - self.not_before).whole_days()
    }
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        if self.oid != E::OID {
            return Err(CertgenError::InvalidInput(format!(
                "extension {} is not {}",
                self.oid,
                E::OID
            )));
        }
        E::from_x509_extension_value(&self.value)
    }

    pub(crate) fn to_x509_extension(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: der::asn1::OctetString::new(self.value.clone())?,
        })
    }

    pub(crate) fn from_x509_extension(ext: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_omits_empty_attributes() {
        let dn = DistinguishedName::builder()
            .common_name("Root CA")
            .organization("Example Corp")
            .country("US")
            .organization_unit("")
            .build();
        let x509 = dn.as_x509_name().unwrap();
        assert_eq!(x509.0.len(), 3);
        let oids: Vec<_> = x509
            .0
            .iter()
            .filter_map(|rdn| rdn.0.iter().next().map(|atv| atv.oid))
            .collect();
        assert_eq!(oids, vec![COUNTRY, ORGANIZATION, COMMON_NAME]);

        let parsed = DistinguishedName::from_x509_name(&x509).unwrap();
        assert_eq!(parsed.common_name, "Root CA");
        assert_eq!(parsed.organization.as_deref(), Some("Example Corp"));
        assert_eq!(parsed.organization_unit, None);
    }

    #[test]
    fn test_country_must_be_printable() {
        let dn = DistinguishedName::builder()
            .common_name("x")
            .country("Ü@")
            .build();
        assert!(matches!(
            dn.as_x509_name(),
            Err(CertgenError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validity_for_days() {
        let validity = Validity::for_days(730).unwrap();
        assert_eq!(validity.days(), 730);
        assert_eq!(validity.not_before.nanosecond(), 0);
    }

    #[test]
    fn test_validity_past_year_9999_is_an_error() {
        let start = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert!(matches!(
            Validity::starting_at(start, 4_000_000),
            Err(CertgenError::InvalidInput(_))
        ));
        assert!(Validity::starting_at(start, u32::MAX).is_err());

        // 2023-11-14 plus 2_900_000 days is still in year 9963.
        let validity = Validity::starting_at(start, 2_900_000).unwrap();
        assert!(validity.not_after.year() <= MAX_ENCODABLE_YEAR);
    }

    #[test]
    fn test_directory_string_rejects_non_string_values() {
        let value = Any::new(Tag::Integer, [0x01u8].as_slice()).unwrap();
        assert!(matches!(
            directory_string(&value),
            Err(CertgenError::DecodingError(_))
        ));
        let value = Any::new(Tag::Utf8String, "Example".as_bytes()).unwrap();
        assert_eq!(directory_string(&value).unwrap(), "Example");
    }

    #[test]
    fn test_extension_param_checks_oid() {
        let param = ExtensionParam::from_extension(
            crate::cert::extensions::BasicConstraints {
                is_ca: false,
                max_path_length: None,
            },
            true,
        )
        .unwrap();
        assert!(
            param
                .to_extension::<crate::cert::extensions::KeyUsage>()
                .is_err()
        );
        assert!(
            !param
                .to_extension::<crate::cert::extensions::BasicConstraints>()
                .unwrap()
                .is_ca
        );
    }
}
