use pcb_netlist::{Net, Netlist, NetlistBox, PinCounts, PortReference};

/// Builder for small netlists.
///
/// ```
/// use pcb_test_utils::NetlistFixture;
///
/// let netlist = NetlistFixture::new()
///     .chip("U1", 2, 0, 2, 0)
///     .resistor("R1")
///     .wire(("U1", 1), ("R1", 1))
///     .label(("R1", 2), "VCC")
///     .build();
/// assert_eq!(netlist.connections.len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct NetlistFixture {
    netlist: Netlist,
}

impl NetlistFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chip(mut self, id: &str, left: u32, bottom: u32, right: u32, top: u32) -> Self {
        self.netlist
            .add_box(NetlistBox::new(id, PinCounts::new(left, bottom, right, top)));
        self
    }

    /// Horizontal two-pin passive (`L1R1`).
    pub fn resistor(self, id: &str) -> Self {
        self.chip(id, 1, 0, 1, 0)
    }

    /// Vertical two-pin passive (`B1T1`).
    pub fn vertical_resistor(self, id: &str) -> Self {
        self.chip(id, 0, 1, 0, 1)
    }

    pub fn net(mut self, id: &str) -> Self {
        self.netlist.add_net(Net::new(id));
        self
    }

    /// Connect two pins given as `(box_id, pin_number)`.
    pub fn wire(mut self, a: (&str, u32), b: (&str, u32)) -> Self {
        self.netlist
            .connect(PortReference::pin(a.0, a.1), PortReference::pin(b.0, b.1));
        self
    }

    /// Connect a pin to a net, declaring the net if needed.
    pub fn label(mut self, pin: (&str, u32), net: &str) -> Self {
        self.netlist
            .add_net(Net::new(net))
            .connect(PortReference::pin(pin.0, pin.1), PortReference::net(net));
        self
    }

    pub fn build(self) -> Netlist {
        self.netlist
    }
}
