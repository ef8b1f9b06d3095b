/// A four-component 8-bit color with straight (non pre-multiplied) alpha
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Color([u8; 4]);

impl Color {
    /// Initialize a new [`Color`]
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Initialize a new opaque [`Color`]
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }
}

impl Color {
    /// Transparent color, returned for reads outside of a surface
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    /// Solid black color
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Solid white color
    pub const WHITE: Color = Color::rgb(255, 255, 255);
}

impl Color {
    /// Red color component
    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    /// Green color component
    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    /// Blue color component
    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// Alpha color component
    #[inline]
    pub fn a(&self) -> u8 {
        self.0[3]
    }

    /// Color components
    #[inline]
    pub fn components(self) -> [u8; 4] {
        self.0
    }

    /// Test if the color represents a opaque color
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.a() == 255
    }

    /// The same color with the alpha component forced to opaque
    #[inline]
    pub fn opaque(self) -> Color {
        Color::rgb(self.r(), self.g(), self.b())
    }
}

impl From<[u8; 4]> for Color {
    #[inline]
    fn from(value: [u8; 4]) -> Self {
        Color(value)
    }
}

impl From<Color> for [u8; 4] {
    #[inline]
    fn from(value: Color) -> Self {
        value.0
    }
}
