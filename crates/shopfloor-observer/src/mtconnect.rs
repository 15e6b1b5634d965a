//! MTConnect-style XML rendering of a single machine record.
//!
//! The document mirrors an MTConnect `current` response closely enough
//! for shop-floor collectors that only read `Sample` values:
//!
//! ```text
//! MTConnectStreams
//! ├── Header (creationTime, sender, instanceId, version)
//! └── Streams
//!     └── DeviceStream (name, uuid)
//!         ├── ComponentStream Controller  -- execution
//!         ├── ComponentStream Spindle     -- spindle_speed, spindle_load
//!         ├── ComponentStream Axes        -- X, Y, Z
//!         ├── ComponentStream Production  -- part_count, total_cycles,
//!         │                                  machine_on_hours, spindle_hours
//!         └── ComponentStream Alarms      -- alarm (or NONE)
//! ```
//!
//! Axis positions and hour counters are printed with exactly three
//! decimals. Every other value uses the already-rounded record value.

use chrono::SecondsFormat;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use shopfloor_types::MachineRecord;

/// Value of the `sender` header attribute.
pub const SENDER: &str = "ShopfloorSimulator";

/// MTConnect schema version advertised in the header.
pub const SCHEMA_VERSION: &str = "1.8";

/// Errors from rendering the XML document.
#[derive(Debug, thiserror::Error)]
pub enum MtconnectError {
    /// The XML writer rejected an event.
    #[error("xml write failed: {0}")]
    Write(String),

    /// The rendered bytes were not valid UTF-8.
    #[error("rendered document is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Render the `MTConnectStreams` document for one machine.
///
/// # Errors
///
/// Returns [`MtconnectError`] if the writer fails, which only happens on
/// an encoding problem in the input strings.
pub fn render_current(record: &MachineRecord) -> Result<String, MtconnectError> {
    let mut doc = StreamWriter::new();

    doc.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    doc.open("MTConnectStreams", &[])?;

    let created = record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
    doc.event(Event::Empty(BytesStart::new("Header").with_attributes([
        ("creationTime", created.as_str()),
        ("sender", SENDER),
        ("instanceId", "1"),
        ("version", SCHEMA_VERSION),
    ])))?;

    doc.open("Streams", &[])?;
    doc.open(
        "DeviceStream",
        &[("name", record.name.as_str()), ("uuid", record.id.as_str())],
    )?;

    doc.component(
        "Controller",
        &[("execution", record.execution.as_str().to_owned())],
    )?;
    doc.component(
        "Spindle",
        &[
            ("spindle_speed", record.spindle_speed.to_string()),
            ("spindle_load", record.spindle_load.to_string()),
        ],
    )?;
    let axes = &record.axis_positions;
    doc.component(
        "Axes",
        &[
            ("X", format!("{:.3}", axes.x)),
            ("Y", format!("{:.3}", axes.y)),
            ("Z", format!("{:.3}", axes.z)),
        ],
    )?;
    doc.component(
        "Production",
        &[
            ("part_count", record.part_count.to_string()),
            ("total_cycles", record.total_cycles.to_string()),
            ("machine_on_hours", format!("{:.3}", record.machine_on_hours)),
            ("spindle_hours", format!("{:.3}", record.spindle_hours)),
        ],
    )?;
    doc.component(
        "Alarms",
        &[(
            "alarm",
            record.alarm.clone().unwrap_or_else(|| String::from("NONE")),
        )],
    )?;

    doc.close("DeviceStream")?;
    doc.close("Streams")?;
    doc.close("MTConnectStreams")?;

    doc.finish()
}

/// Thin wrapper over an indenting [`Writer`] with element helpers.
struct StreamWriter {
    writer: Writer<Vec<u8>>,
}

impl StreamWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), MtconnectError> {
        self.writer
            .write_event(event)
            .map_err(|e| MtconnectError::Write(e.to_string()))
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MtconnectError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.event(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<(), MtconnectError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    /// Write one `ComponentStream` holding a `Samples` block.
    fn component(
        &mut self,
        component: &str,
        samples: &[(&str, String)],
    ) -> Result<(), MtconnectError> {
        self.open("ComponentStream", &[("component", component)])?;
        self.open("Samples", &[])?;
        for (name, value) in samples {
            self.open("Sample", &[("name", *name)])?;
            self.event(Event::Text(BytesText::new(value)))?;
            self.close("Sample")?;
        }
        self.close("Samples")?;
        self.close("ComponentStream")
    }

    fn finish(self) -> Result<String, MtconnectError> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        Ok(String::from_utf8(bytes)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use quick_xml::Reader;
    use quick_xml::events::Event;
    use shopfloor_core::config::default_machines;
    use shopfloor_core::fleet::Fleet;
    use shopfloor_types::MachineRecord;

    use super::render_current;

    fn record(id: &str) -> MachineRecord {
        let fleet = Fleet::from_config(&default_machines(), &Default::default()).unwrap();
        let mut record = fleet.snapshot(id).unwrap();
        record.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        record
    }

    /// Collect `(component, sample name) -> text` from a rendered document.
    fn samples(xml: &str) -> BTreeMap<(String, String), String> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut out = BTreeMap::new();
        let mut component = String::new();
        let mut sample = None;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"ComponentStream" => {
                    let attr = e.try_get_attribute("component").unwrap().unwrap();
                    component = attr.unescape_value().unwrap().into_owned();
                }
                Event::Start(e) if e.name().as_ref() == b"Sample" => {
                    let attr = e.try_get_attribute("name").unwrap().unwrap();
                    sample = Some(attr.unescape_value().unwrap().into_owned());
                }
                Event::Text(t) => {
                    if let Some(name) = sample.take() {
                        let text = t.unescape().unwrap().into_owned();
                        out.insert((component.clone(), name), text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    fn get<'a>(map: &'a BTreeMap<(String, String), String>, c: &str, n: &str) -> &'a str {
        map[&(c.to_owned(), n.to_owned())].as_str()
    }

    #[test]
    fn renders_all_component_streams() {
        let xml = render_current(&record("haas_vf2")).unwrap();
        let map = samples(&xml);

        assert_eq!(get(&map, "Controller", "execution"), "IDLE");
        assert_eq!(get(&map, "Spindle", "spindle_speed"), "0");
        assert_eq!(get(&map, "Axes", "X"), "381.000");
        assert_eq!(get(&map, "Axes", "Z"), "508.000");
        assert_eq!(get(&map, "Production", "part_count"), "0");
        assert_eq!(get(&map, "Production", "machine_on_hours"), "0.000");
        assert_eq!(get(&map, "Alarms", "alarm"), "NONE");
        assert_eq!(map.len(), 11);
    }

    #[test]
    fn header_and_device_attributes() {
        let xml = render_current(&record("durma_press")).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("creationTime=\"2024-05-01T08:30:00.000Z\""));
        assert!(xml.contains("instanceId=\"1\""));
        assert!(xml.contains("version=\"1.8\""));
        assert!(xml.contains("uuid=\"durma_press\""));
    }

    #[test]
    fn active_alarm_is_reported() {
        let mut rec = record("fiber_laser");
        rec.alarm = Some(String::from("RESONATOR_OVERHEAT"));
        let map = samples(&render_current(&rec).unwrap());
        assert_eq!(get(&map, "Alarms", "alarm"), "RESONATOR_OVERHEAT");
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        let mut rec = record("cnc_lathe");
        rec.name = String::from("Lathe <A&B>");
        rec.alarm = Some(String::from("DOOR<OPEN>"));
        let xml = render_current(&rec).unwrap();
        assert!(xml.contains("name=\"Lathe &lt;A&amp;B&gt;\""));

        let map = samples(&xml);
        assert_eq!(get(&map, "Alarms", "alarm"), "DOOR<OPEN>");
    }
}
