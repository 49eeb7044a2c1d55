//! SPIR-V binary decoding.
//!
//! The decoder validates the module header and then hands out instructions
//! lazily, one `(opcode, operands)` pair at a time. Every instruction's word
//! count is checked against what's actually left in the buffer, so an
//! instruction view never reads past the end of the module.
use std::convert::TryFrom;
use std::iter::FromIterator;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use num_traits::FromPrimitive;
use crate::consts::*;
use crate::error::{Error, Result};

pub type InstrId = u32;

/// SPIR-V program binary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SpirvBinary(Vec<u32>);
impl From<Vec<u32>> for SpirvBinary {
    fn from(x: Vec<u32>) -> Self { SpirvBinary(x) }
}
impl From<&[u32]> for SpirvBinary {
    fn from(x: &[u32]) -> Self { SpirvBinary(x.to_owned()) }
}
impl FromIterator<u32> for SpirvBinary {
    fn from_iter<I: IntoIterator<Item=u32>>(iter: I) -> Self {
        SpirvBinary(iter.into_iter().collect::<Vec<u32>>())
    }
}
impl TryFrom<&[u8]> for SpirvBinary {
    type Error = Error;
    /// Decode a byte buffer. The byte order is detected from the magic
    /// number; any other leading word is left for the header check to
    /// reject.
    fn try_from(x: &[u8]) -> Result<SpirvBinary> {
        if x.len() % 4 != 0 {
            return Err(Error::corrupted("byte length is not a multiple of word size"));
        }
        let is_big_endian = x.len() >= 4 && BigEndian::read_u32(&x[..4]) == SPIRV_MAGIC;
        let words = x.chunks_exact(4)
            .map(|word| if is_big_endian {
                BigEndian::read_u32(word)
            } else {
                LittleEndian::read_u32(word)
            })
            .collect::<SpirvBinary>();
        Ok(words)
    }
}
impl TryFrom<Vec<u8>> for SpirvBinary {
    type Error = Error;
    fn try_from(x: Vec<u8>) -> Result<SpirvBinary> { SpirvBinary::try_from(x.as_ref() as &[u8]) }
}
impl SpirvBinary {
    pub fn words(&self) -> &[u32] { &self.0 }
    pub fn into_words(self) -> Vec<u32> { self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHeader {
    pub magic: u32,
    /// SPIR-V version in `(major, minor)`.
    pub version: (u8, u8),
    pub generator: u32,
    /// All IDs in the module are less than this.
    pub bound: u32,
    pub schema: u32,
}
impl ModuleHeader {
    fn parse(words: &[u32]) -> Result<ModuleHeader> {
        if words.len() < HEADER_LEN {
            return Err(Error::corrupted("module is shorter than its header"));
        }
        let magic = words[0];
        if magic != SPIRV_MAGIC {
            return Err(Error::corrupted(format!("bad magic number {:#010x}", magic)));
        }
        let version = words[1];
        if version & 0xFF0000FF != 0 {
            return Err(Error::corrupted(format!("bad version word {:#010x}", version)));
        }
        let version = ((version >> 16) as u8, (version >> 8) as u8);
        if version.0 != MAX_VERSION.0 || version.1 > MAX_VERSION.1 {
            return Err(Error::unsupported(format!("spirv version {}.{}", version.0, version.1)));
        }
        let bound = words[3];
        if bound == 0 {
            return Err(Error::corrupted("id bound is zero"));
        }
        let header = ModuleHeader {
            magic,
            version,
            generator: words[2],
            bound,
            schema: words[4],
        };
        Ok(header)
    }
}

/// A header-validated view of a SPIR-V module.
#[derive(Debug, Clone, Copy)]
pub struct SpirvModule<'a> {
    header: ModuleHeader,
    words: &'a [u32],
}
impl<'a> SpirvModule<'a> {
    pub fn new(words: &'a [u32]) -> Result<SpirvModule<'a>> {
        let header = ModuleHeader::parse(words)?;
        Ok(SpirvModule { header, words: &words[HEADER_LEN..] })
    }
    pub fn header(&self) -> &ModuleHeader { &self.header }
    /// Instructions in the module body. The iterator is single-pass; call
    /// this again for a fresh one.
    pub fn instrs(&self) -> Instrs<'a> {
        Instrs { words: self.words, bound: self.header.bound, failed: false }
    }
}


pub struct Instrs<'a> {
    words: &'a [u32],
    bound: u32,
    failed: bool,
}
impl<'a> Iterator for Instrs<'a> {
    type Item = Result<Instr<'a>>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.failed { return None; }
        let head = *self.words.first()?;
        let len = (head >> 16) as usize;
        let opcode = head & 0xFFFF;
        if len == 0 || len > self.words.len() {
            self.failed = true;
            let err = if len == 0 {
                Error::corrupted(format!("instruction {} has zero word count", opcode))
            } else {
                Error::corrupted(format!("instruction {} is truncated", opcode))
            };
            return Some(Err(err));
        }
        let instr = Instr {
            opcode,
            operands: &self.words[1..len],
            bound: self.bound,
        };
        self.words = &self.words[len..];
        Some(Ok(instr))
    }
}
impl<'a> std::iter::FusedIterator for Instrs<'a> {}


#[derive(Debug, Clone, Copy)]
pub struct Instr<'a> {
    opcode: u32,
    operands: &'a [u32],
    bound: u32,
}
impl<'a> Instr<'a> {
    /// Get the opcode of the instruction.
    pub fn opcode(&self) -> u32 { self.opcode }
    /// Get the word count of the instruction, including the first word
    /// containing the word count and opcode.
    pub fn word_count(&self) -> usize { self.operands.len() + 1 }
    /// Get an instruction operand reader. Every read is bounds-checked and
    /// reports a corrupted binary when the operands run out.
    pub fn operands(&self) -> Operands<'a> {
        Operands { words: self.operands, bound: self.bound }
    }
}

pub struct Operands<'a> {
    words: &'a [u32],
    bound: u32,
}
impl<'a> Operands<'a> {
    pub fn read_bool(&mut self) -> Result<bool> { self.read_u32().map(|x| x != 0) }
    pub fn read_u32(&mut self) -> Result<u32> {
        if let Some((x, rest)) = self.words.split_first() {
            self.words = rest;
            Ok(*x)
        } else { Err(Error::corrupted("instruction is missing operands")) }
    }
    /// Read an ID operand. IDs are non-zero and less than the module bound.
    pub fn read_id(&mut self) -> Result<InstrId> {
        let id = self.read_u32()?;
        check_id(id, self.bound)?;
        Ok(id)
    }
    pub fn read_enum<E: FromPrimitive>(&mut self) -> Result<E> {
        let x = self.read_u32()?;
        E::from_u32(x).ok_or_else(|| Error::unsupported(format!("unknown enumerant {}", x)))
    }
    pub fn read_str(&mut self) -> Result<String> {
        // Each word packs four UTF-8 bytes in little-endian order. The string
        // ends at the first nul byte and is padded to a word boundary.
        let mut bytes = Vec::new();
        let mut nword = 0;
        'words: for word in self.words {
            nword += 1;
            for &byte in word.to_le_bytes().iter() {
                if byte == 0 { break 'words; }
                bytes.push(byte);
            }
            if nword == self.words.len() {
                return Err(Error::corrupted("string literal is not nul-terminated"));
            }
        }
        if nword == 0 {
            return Err(Error::corrupted("instruction is missing operands"));
        }
        self.words = &self.words[nword..];
        String::from_utf8(bytes)
            .map_err(|_| Error::corrupted("string literal is not valid utf-8"))
    }
    pub fn read_list(&mut self) -> Result<&'a [u32]> {
        let rv = self.words;
        self.words = &[];
        Ok(rv)
    }
    /// Read all remaining operands as IDs.
    pub fn read_id_list(&mut self) -> Result<&'a [InstrId]> {
        let rv = self.read_list()?;
        for &id in rv {
            check_id(id, self.bound)?;
        }
        Ok(rv)
    }
}

pub(crate) fn check_id(id: InstrId, bound: u32) -> Result<()> {
    if id == 0 || id >= bound {
        Err(Error::corrupted(format!("id {} is out of bound {}", id, bound)))
    } else { Ok(()) }
}
