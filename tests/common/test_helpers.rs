use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const IPXACT_NS: &str = "http://www.accellera.org/XMLSchema/IPXACT/1685-2014";

/// Schema header shared by every file of the miniature IP-XACT schema set
fn schema(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    xmlns:ipxact="{ns}"
    targetNamespace="{ns}"
    elementFormDefault="qualified">
{body}
</xs:schema>
"#,
        ns = IPXACT_NS,
        body = body
    )
}

pub fn index_xsd() -> String {
    schema(r#"    <xs:include schemaLocation="component.xsd"/>"#)
}

pub fn component_xsd() -> String {
    schema(
        r#"    <xs:include schemaLocation="identifier.xsd"/>
    <xs:include schemaLocation="model.xsd"/>
    <xs:element name="component">
        <xs:complexType>
            <xs:sequence>
                <xs:element ref="ipxact:vendor"/>
                <xs:element ref="ipxact:library"/>
                <xs:element ref="ipxact:name"/>
                <xs:element ref="ipxact:version"/>
                <xs:element ref="ipxact:model"/>
            </xs:sequence>
        </xs:complexType>
    </xs:element>"#,
    )
}

pub fn identifier_xsd() -> String {
    schema(
        r#"    <xs:element name="vendor" type="xs:Name"/>
    <xs:element name="library" type="xs:Name"/>
    <xs:element name="name" type="xs:NMTOKEN"/>
    <xs:element name="version" type="xs:string"/>"#,
    )
}

pub fn model_xsd() -> String {
    schema(
        r#"    <xs:include schemaLocation="port.xsd"/>
    <xs:include schemaLocation="identifier.xsd"/>
    <xs:element name="model">
        <xs:complexType>
            <xs:sequence>
                <xs:element name="views">
                    <xs:complexType>
                        <xs:sequence>
                            <xs:element name="view" maxOccurs="unbounded">
                                <xs:complexType>
                                    <xs:sequence>
                                        <xs:element ref="ipxact:name"/>
                                    </xs:sequence>
                                </xs:complexType>
                            </xs:element>
                        </xs:sequence>
                    </xs:complexType>
                </xs:element>
                <xs:element name="ports">
                    <xs:complexType>
                        <xs:sequence>
                            <xs:element ref="ipxact:port" maxOccurs="unbounded"/>
                        </xs:sequence>
                    </xs:complexType>
                </xs:element>
            </xs:sequence>
        </xs:complexType>
    </xs:element>"#,
    )
}

pub fn port_xsd() -> String {
    schema(
        r#"    <xs:element name="port">
        <xs:complexType>
            <xs:sequence>
                <xs:element ref="ipxact:name"/>
                <xs:choice>
                    <xs:element name="wire">
                        <xs:complexType>
                            <xs:sequence>
                                <xs:element name="direction" type="xs:string"/>
                            </xs:sequence>
                        </xs:complexType>
                    </xs:element>
                    <xs:element name="transactional">
                        <xs:complexType>
                            <xs:sequence>
                                <xs:element name="initiative" type="xs:string"/>
                            </xs:sequence>
                        </xs:complexType>
                    </xs:element>
                </xs:choice>
            </xs:sequence>
        </xs:complexType>
    </xs:element>"#,
    )
}

/// Files of the miniature schema set. `index.xsd` has four unique transitive dependencies,
/// and `identifier.xsd` is referenced twice.
pub fn mini_schema_files() -> Vec<(&'static str, String)> {
    vec![
        ("index.xsd", index_xsd()),
        ("component.xsd", component_xsd()),
        ("identifier.xsd", identifier_xsd()),
        ("model.xsd", model_xsd()),
        ("port.xsd", port_xsd()),
    ]
}

/// The miniature schema set keyed by absolute URL under `base` (which ends in `/`)
pub fn mini_schema_by_url(base: &str) -> HashMap<String, Vec<u8>> {
    mini_schema_files()
        .into_iter()
        .map(|(name, body)| (format!("{}{}", base, name), body.into_bytes()))
        .collect()
}

/// Write the miniature schema set into `dir`, returning the path of `index.xsd`
pub fn write_mini_schema(dir: &Path) -> PathBuf {
    for (name, body) in mini_schema_files() {
        std::fs::write(dir.join(name), body).unwrap();
    }
    dir.join("index.xsd")
}

fn component_with(identity: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ipxact:component xmlns:ipxact="{ns}">
{identity}
  <ipxact:model>
    <ipxact:views>
      <ipxact:view><ipxact:name>rtl</ipxact:name></ipxact:view>
    </ipxact:views>
    <ipxact:ports>
      <ipxact:port>
        <ipxact:name>clk</ipxact:name>
        <ipxact:wire><ipxact:direction>in</ipxact:direction></ipxact:wire>
      </ipxact:port>
      <ipxact:port>
        <ipxact:name>bus</ipxact:name>
        <ipxact:transactional><ipxact:initiative>provides</ipxact:initiative></ipxact:transactional>
      </ipxact:port>
    </ipxact:ports>
  </ipxact:model>
</ipxact:component>
"#,
        ns = IPXACT_NS,
        identity = identity
    )
}

/// A component accepted by both the miniature schema and the content check
pub fn conformant_component() -> String {
    component_with(
        "  <ipxact:vendor>acme.com</ipxact:vendor>
  <ipxact:library>peripherals</ipxact:library>
  <ipxact:name>uart</ipxact:name>
  <ipxact:version>1.0</ipxact:version>",
    )
}

/// Has every required tag (so the content check passes) but in an order the schema rejects
pub fn misordered_component() -> String {
    component_with(
        "  <ipxact:vendor>acme.com</ipxact:vendor>
  <ipxact:library>peripherals</ipxact:library>
  <ipxact:version>1.0</ipxact:version>
  <ipxact:name>uart</ipxact:name>",
    )
}

/// Not well-formed
pub fn malformed_component() -> String {
    conformant_component().replace("</ipxact:library>", "")
}

/// Root element never closed
pub fn truncated_component() -> String {
    conformant_component().replace("</ipxact:component>", "")
}

/// Conformant component declared and encoded as ISO-8859-1, with a non-ASCII byte
pub fn latin1_component() -> Vec<u8> {
    let mut bytes = conformant_component()
        .replacen(r#"encoding="UTF-8""#, r#"encoding="ISO-8859-1""#, 1)
        .into_bytes();
    bytes.extend_from_slice(b"\n<!-- Caf");
    bytes.push(0xE9);
    bytes.extend_from_slice(b" -->\n");
    bytes
}
