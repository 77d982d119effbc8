//! Pre-authored layouts used as adaptation starting points.

use pcb_netlist::Netlist;
use serde::{Deserialize, Serialize};

use crate::SchError;
use crate::circuit::Circuit;

pub type TemplateFn = fn() -> Result<Circuit, SchError>;

/// A named template factory.
#[derive(Debug, Clone, Copy)]
pub struct TemplateFactory {
    pub name: &'static str,
    pub build: TemplateFn,
}

pub const BUILTIN_TEMPLATES: &[TemplateFactory] = &[
    TemplateFactory {
        name: "voltage_divider",
        build: voltage_divider,
    },
    TemplateFactory {
        name: "led_driver",
        build: led_driver,
    },
    TemplateFactory {
        name: "opamp_feedback",
        build: opamp_feedback,
    },
    TemplateFactory {
        name: "dual_chip",
        build: dual_chip,
    },
    TemplateFactory {
        name: "decoupled_regulator",
        build: decoupled_regulator,
    },
    TemplateFactory {
        name: "connector_4",
        build: connector_4,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub circuit: Circuit,
}

/// Read-only, ordered template collection searched by the matcher.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Result<Self, SchError> {
        Self::from_factories(BUILTIN_TEMPLATES)
    }

    pub fn from_factories(factories: &[TemplateFactory]) -> Result<Self, SchError> {
        let mut library = Self::new();
        for factory in factories {
            library.push(factory.name, (factory.build)()?);
        }
        Ok(library)
    }

    pub fn push(&mut self, name: impl Into<String>, circuit: Circuit) {
        self.templates.push(Template {
            name: name.into(),
            circuit,
        });
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, index: usize) -> Option<&Template> {
        self.templates.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.templates.iter().position(|t| t.name == name)
    }

    /// Netlist snapshots in library order.
    pub fn netlists(&self) -> Vec<Netlist> {
        self.templates.iter().map(|t| t.circuit.get_netlist()).collect()
    }

    /// A fresh working copy of the template at `index`.
    pub fn instantiate(&self, index: usize) -> Option<Circuit> {
        self.templates.get(index).map(|t| t.circuit.clone())
    }
}

fn voltage_divider() -> Result<Circuit, SchError> {
    let mut c = Circuit::new();
    c.add_chip("R1").bottom_pins(1).top_pins(1).passive().at(0, 4).add()?;
    c.add_chip("R2").bottom_pins(1).top_pins(1).passive().at(0, 0).add()?;
    c.pin("R1", 2)?.line(0, 1)?.label("VIN")?;
    c.pin("R1", 1)?.join("R2", 2)?;
    c.pin("R2", 2)?.line(1, 0)?.label("VOUT")?;
    c.pin("R2", 1)?.line(0, -1)?.label("GND")?;
    Ok(c)
}

fn led_driver() -> Result<Circuit, SchError> {
    let mut c = Circuit::new();
    c.add_chip("U1").left_pins(2).right_pins(2).add()?;
    c.pin("U1", 1)?.line(-2, 0)?.label("VCC")?;
    c.pin("U1", 2)?.line(-2, 0)?.label("GND")?;
    c.pin("U1", 3)?.line(1, 0)?.passive("R1")?.line(1, 0)?.label("LED")?;
    Ok(c)
}

fn opamp_feedback() -> Result<Circuit, SchError> {
    let mut c = Circuit::new();
    c.add_chip("U1").left_pins(4).right_pins(4).add()?;
    c.pin("U1", 1)?.line(-2, 0)?.label("IN")?;
    c.pin("U1", 2)?.line(-1, 0)?.passive("R1")?.line(0, -5)?.join("U1", 6)?;
    c.pin("U1", 4)?.line(-2, 0)?.label("GND")?;
    c.pin("U1", 6)?.line(2, 0)?.label("OUT")?;
    c.pin("U1", 8)?.line(1, 0)?.label("VCC")?;
    Ok(c)
}

fn dual_chip() -> Result<Circuit, SchError> {
    let mut c = Circuit::new();
    c.add_chip("U1").left_pins(3).right_pins(3).add()?;
    c.add_chip("U2").left_pins(3).right_pins(3).at(6, 0).add()?;
    c.pin("U1", 4)?.join("U2", 3)?;
    c.pin("U1", 5)?.join("U2", 2)?;
    c.pin("U1", 6)?.join("U2", 1)?;
    c.pin("U1", 1)?.line(-1, 0)?.label("VCC")?;
    c.pin("U1", 3)?.line(-1, 0)?.label("GND")?;
    c.pin("U2", 4)?.line(1, 0)?.label("OUT")?;
    c.pin("U2", 6)?.line(1, 0)?.label("GND")?;
    Ok(c)
}

fn decoupled_regulator() -> Result<Circuit, SchError> {
    let mut c = Circuit::new();
    c.add_chip("U1")
        .left_pins(2)
        .bottom_pins(1)
        .right_pins(2)
        .add()?;
    c.pin("U1", 1)?.line(-3, 0)?.label("VIN")?;
    c.pin("U1", 2)?
        .line(-1, 0)?
        .line(0, -1)?
        .passive("C1")?
        .line(0, -1)?
        .label("GND")?;
    c.pin("U1", 3)?.line(0, -1)?.label("GND")?;
    c.pin("U1", 4)?
        .line(1, 0)?
        .line(0, -1)?
        .passive("C2")?
        .line(0, -1)?
        .label("GND")?;
    c.pin("U1", 5)?.line(3, 0)?.label("VOUT")?;
    Ok(c)
}

fn connector_4() -> Result<Circuit, SchError> {
    let mut c = Circuit::new();
    c.add_chip("J1").right_pins(4).add()?;
    for pin in 1..=4 {
        c.pin("J1", pin)?.line(2, 0)?.label(&format!("P{pin}"))?;
    }
    Ok(c)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn builtin_templates_are_well_formed() {
        let library = TemplateLibrary::builtin().unwrap();
        assert_eq!(library.len(), BUILTIN_TEMPLATES.len());
        let names: HashSet<&str> = library.templates().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names.len(), library.len());
        for template in library.templates() {
            template.circuit.get_netlist().validate().unwrap();
            assert!(template.circuit.dangling_refs().is_empty(), "{}", template.name);
        }
    }

    #[test]
    fn divider_netlist() {
        let library = TemplateLibrary::builtin().unwrap();
        let index = library.index_of("voltage_divider").unwrap();
        let netlist = &library.netlists()[index];
        let rendered = netlist
            .connections
            .iter()
            .map(|c| {
                c.connected_ports
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");
        insta::assert_snapshot!(rendered, @r"
        R1.2 net:VIN
        R2.2 net:VOUT R1.1
        R2.1 net:GND
        ");
    }

    #[test]
    fn shared_nets_merge_into_one_connection() {
        let library = TemplateLibrary::builtin().unwrap();
        let index = library.index_of("decoupled_regulator").unwrap();
        let netlist = &library.netlists()[index];
        let gnd = netlist
            .connection_for(&pcb_netlist::PortReference::net("GND"))
            .unwrap();
        assert_eq!(gnd.connected_ports.len(), 4);
        assert_eq!(netlist.boxes.len(), 3);
    }

    #[test]
    fn circuits_persist_as_json() {
        let library = TemplateLibrary::builtin().unwrap();
        let template = library.get(library.index_of("opamp_feedback").unwrap()).unwrap();
        let json = serde_json::to_string(&template.circuit).unwrap();
        assert!(json.contains("\"netLabels\""));
        let restored: Circuit = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, template.circuit);
    }

    #[test]
    fn instantiate_returns_independent_copy() {
        let library = TemplateLibrary::builtin().unwrap();
        let mut copy = library.instantiate(0).unwrap();
        copy.remove_chip("R1").unwrap();
        assert!(library.get(0).unwrap().circuit.has_chip("R1"));
        assert!(library.instantiate(library.len()).is_none());
    }
}
